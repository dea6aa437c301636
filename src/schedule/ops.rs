//! Anchored markers -> time-ordered edit operations.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::schedule::anchor::AnchoredMarker;
use crate::schedule::config::OverlayConfig;
use crate::schedule::icon::IconSide;
use crate::script::markers::MarkerKind;

/// Hold one captured source frame under a fading slate, with silence underneath.
#[derive(Clone, Debug, PartialEq)]
pub struct FreezeInsert {
    /// Source-timeline seconds where the insert begins.
    pub at_time: f64,
    /// Frame shown as the backdrop for the whole insert.
    pub source_frame: u64,
    pub duration: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub overlay_image: Option<PathBuf>,
    /// Slate opacity cap.
    pub overlay_alpha: f64,
    pub overlay_id: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IconMove {
    pub at_time: f64,
    pub from_side: IconSide,
    pub to_side: IconSide,
    pub anim_sec: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditOp {
    FreezeInsert(FreezeInsert),
    IconMove(IconMove),
}

impl EditOp {
    pub fn at_time(&self) -> f64 {
        match self {
            Self::FreezeInsert(f) => f.at_time,
            Self::IconMove(m) => m.at_time,
        }
    }
}

/// Freeze inserts in application order.
pub fn freezes(ops: &[EditOp]) -> Vec<&FreezeInsert> {
    ops.iter()
        .filter_map(|op| match op {
            EditOp::FreezeInsert(f) => Some(f),
            EditOp::IconMove(_) => None,
        })
        .collect()
}

pub fn icon_moves(ops: &[EditOp]) -> Vec<IconMove> {
    ops.iter()
        .filter_map(|op| match op {
            EditOp::IconMove(m) => Some(*m),
            EditOp::FreezeInsert(_) => None,
        })
        .collect()
}

/// One op per marker at `anchor_time - pre_roll`, stable-sorted by time.
///
/// Insert times never go below zero, and a freeze that would land before the
/// previous freeze's insertion point is moved up to it. Icon moves alternate
/// sides starting from the right.
#[tracing::instrument(skip_all, fields(markers = markers.len()))]
pub fn schedule_edits(
    markers: &[AnchoredMarker],
    fps: Fps,
    cfg: &OverlayConfig,
) -> VisemixResult<Vec<EditOp>> {
    let mut ops = Vec::with_capacity(markers.len());
    let mut freeze_cursor = 0.0f64;
    let mut icon_side = IconSide::Right;
    let global = cfg.resolve(None, fps.as_f64());

    for am in markers {
        match am.marker.kind {
            MarkerKind::Overlay { id } => {
                let o = cfg.resolve(id, fps.as_f64());
                if o.duration.is_nan() || o.duration <= 0.0 {
                    return Err(VisemixError::timing(format!(
                        "overlay on script line {} has non-positive duration {}",
                        am.marker.line, o.duration
                    )));
                }
                let mut at_time = (am.anchor_time - o.pre_roll_sec).max(0.0);
                if at_time < freeze_cursor {
                    at_time = freeze_cursor;
                }
                freeze_cursor = at_time;
                let fade = o.fade.clamp(0.0, o.duration / 2.0);
                debug!(line = am.marker.line, ?id, at_time, duration = o.duration, "freeze scheduled");
                ops.push(EditOp::FreezeInsert(FreezeInsert {
                    at_time,
                    source_frame: fps.secs_to_frames_floor(at_time),
                    duration: o.duration,
                    fade_in: fade,
                    fade_out: fade,
                    overlay_image: o.image,
                    overlay_alpha: o.overlay_alpha,
                    overlay_id: id,
                }));
            }
            MarkerKind::ProcessFormSwap => {
                let at_time = (am.anchor_time - global.pre_roll_sec).max(0.0);
                let to_side = icon_side.flipped();
                ops.push(EditOp::IconMove(IconMove {
                    at_time,
                    from_side: icon_side,
                    to_side,
                    anim_sec: cfg.pf_anim_sec.max(0.0),
                }));
                icon_side = to_side;
            }
        }
    }

    ops.sort_by(|a, b| a.at_time().total_cmp(&b.at_time()));
    info!(
        freezes = freezes(&ops).len(),
        icon_moves = ops.len() - freezes(&ops).len(),
        "edits scheduled"
    );
    Ok(ops)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/ops.rs"]
mod tests;
