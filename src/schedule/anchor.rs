//! Second stage of marker handling: script order -> beat boundary time.

use tracing::debug;

use crate::foundation::error::{VisemixError, VisemixResult};
use crate::script::markers::{Marker, ScriptScan, TokenKind};
use crate::timeline::model::{BeatKind, Timeline};

/// Which beat boundary a marker attaches to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    /// End of the beat immediately preceding the marker in script order.
    #[default]
    #[value(name = "prev_end")]
    PrevEnd,
    /// Start of the beat immediately following the marker.
    #[value(name = "next_start")]
    NextStart,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnchoredMarker {
    pub marker: Marker,
    /// Absolute timeline seconds of the anchor boundary (before pre-roll).
    pub anchor_time: f64,
    /// Beat whose boundary was used.
    pub beat_index: usize,
}

/// Align script tokens with beats by kind, in order, and resolve each marker's anchor.
///
/// A `line` token consumes the next speech beat and a `pause` token the next
/// pause beat; beats of the other kind are skipped over. A marker that has no
/// beat on the requested side fails with a marker resolution error.
#[tracing::instrument(skip_all, fields(policy = ?policy))]
pub fn anchor_markers(
    scan: &ScriptScan,
    timeline: &Timeline,
    policy: AnchorPolicy,
) -> VisemixResult<Vec<AnchoredMarker>> {
    let beats = timeline.beats();
    let mut consumed = 0usize;
    let mut out = Vec::new();

    for token in &scan.tokens {
        let wanted = match token.kind {
            TokenKind::Line => BeatKind::Speech,
            TokenKind::Pause => BeatKind::Pause,
            TokenKind::Marker { marker } => {
                let m = Marker {
                    kind: marker,
                    line: token.line,
                    script_index: token.index,
                };
                let (beat_index, anchor_time) = match policy {
                    AnchorPolicy::PrevEnd => {
                        let idx = consumed.checked_sub(1).ok_or_else(|| {
                            VisemixError::marker(format!(
                                "marker {:?} on script line {} precedes the first beat",
                                marker, token.line
                            ))
                        })?;
                        (idx, beats[idx].tc_out())
                    }
                    AnchorPolicy::NextStart => {
                        let b = beats.get(consumed).ok_or_else(|| {
                            VisemixError::marker(format!(
                                "marker {:?} on script line {} follows the last beat",
                                marker, token.line
                            ))
                        })?;
                        (consumed, b.tc_in)
                    }
                };
                debug!(line = token.line, beat_index, anchor_time, "marker anchored");
                out.push(AnchoredMarker {
                    marker: m,
                    anchor_time,
                    beat_index,
                });
                continue;
            }
        };
        while consumed < beats.len() && beats[consumed].kind != wanted {
            consumed += 1;
        }
        if consumed < beats.len() {
            consumed += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/anchor.rs"]
mod tests;
