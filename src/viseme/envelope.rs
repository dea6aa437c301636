//! Per-phoneme trapezoid activations merged into per-channel breakpoint curves.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::foundation::core::Fps;
use crate::foundation::error::{VisemixError, VisemixResult};
use crate::timeline::characters::CharacterMap;
use crate::timeline::model::{Phoneme, Timeline};
use crate::viseme::table::VisemeTable;

/// Per-character scaling and curve shape.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WeightsProfile {
    /// Plateau weight of every activation.
    pub peak: f64,
    /// Overrides the timeline's ramp fraction when set.
    pub ramp_fraction: Option<f64>,
}

impl Default for WeightsProfile {
    fn default() -> Self {
        Self {
            peak: 1.0,
            ramp_fraction: None,
        }
    }
}

impl WeightsProfile {
    pub fn validate(&self, name: &str) -> VisemixResult<()> {
        if !self.peak.is_finite() || self.peak <= 0.0 || self.peak > 1.0 {
            return Err(VisemixError::validation(format!(
                "character '{name}' profile peak must be within (0, 1], got {}",
                self.peak
            )));
        }
        if let Some(f) = self.ramp_fraction
            && (!f.is_finite() || f <= 0.0)
        {
            return Err(VisemixError::validation(format!(
                "character '{name}' profile ramp_fraction must be > 0, got {f}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Breakpoint {
    pub time: f64,
    pub weight: f64,
}

/// Piecewise-linear weight over absolute timeline seconds; zero outside its points.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisemeCurve {
    pub character: String,
    pub channel: String,
    pub points: Vec<Breakpoint>,
}

impl VisemeCurve {
    pub fn weight_at(&self, t: f64) -> f64 {
        eval(&self.points, t).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CharacterCurves {
    pub character: String,
    pub curves: BTreeMap<String, VisemeCurve>,
}

impl CharacterCurves {
    /// Channels with no activations read as 0.
    pub fn weight_at(&self, channel: &str, t: f64) -> f64 {
        self.curves.get(channel).map_or(0.0, |c| c.weight_at(t))
    }
}

/// Trapezoid for one phoneme: ramp up to `start`, hold until `end`, ramp down.
/// Ramps are a fraction of the phoneme length, never shorter than one frame.
pub fn activation(phoneme: &Phoneme, peak: f64, ramp_fraction: f64, fps: Fps) -> [Breakpoint; 4] {
    let start = phoneme.start.min(phoneme.end);
    let end = phoneme.start.max(phoneme.end);
    let ramp = (ramp_fraction * (end - start)).max(fps.frame_duration_secs());
    [
        Breakpoint {
            time: start - ramp,
            weight: 0.0,
        },
        Breakpoint {
            time: start,
            weight: peak,
        },
        Breakpoint {
            time: end,
            weight: peak,
        },
        Breakpoint {
            time: end + ramp,
            weight: 0.0,
        },
    ]
}

/// Upper envelope of two piecewise-linear functions, crossings included.
pub fn max_merge(a: &[Breakpoint], b: &[Breakpoint]) -> Vec<Breakpoint> {
    let mut times: Vec<f64> = a.iter().chain(b).map(|p| p.time).collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    let mut out = Vec::with_capacity(times.len() + 4);
    let mut prev: Option<(f64, f64, f64)> = None;
    for t in times {
        let (va, vb) = (eval(a, t), eval(b, t));
        if let Some((pt, pa, pb)) = prev {
            let d0 = pa - pb;
            let d1 = va - vb;
            if (d0 > 0.0 && d1 < 0.0) || (d0 < 0.0 && d1 > 0.0) {
                let x = d0 / (d0 - d1);
                let tc = pt + (t - pt) * x;
                out.push(Breakpoint {
                    time: tc,
                    weight: pa + (va - pa) * x,
                });
            }
        }
        out.push(Breakpoint {
            time: t,
            weight: va.max(vb),
        });
        prev = Some((t, va, vb));
    }
    out
}

/// Merge one activation into a curve in place, touching only the overlapped span.
fn merge_into(curve: &mut Vec<Breakpoint>, act: &[Breakpoint]) {
    let (Some(first), Some(last)) = (act.first(), act.last()) else {
        return;
    };
    if curve.is_empty() {
        curve.extend_from_slice(act);
        return;
    }
    let lo = curve
        .partition_point(|p| p.time <= first.time)
        .saturating_sub(1);
    let hi = curve
        .partition_point(|p| p.time < last.time)
        .min(curve.len() - 1);
    let merged = max_merge(&curve[lo..=hi], act);
    curve.splice(lo..=hi, merged);
}

fn eval(points: &[Breakpoint], t: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if t < first.time || t > last.time {
        return 0.0;
    }
    let i = points.partition_point(|p| p.time <= t);
    if i == 0 {
        return first.weight;
    }
    if i >= points.len() {
        return last.weight;
    }
    let p0 = points[i - 1];
    let p1 = points[i];
    let span = p1.time - p0.time;
    if span <= 0.0 {
        return p1.weight;
    }
    p0.weight + (p1.weight - p0.weight) * ((t - p0.time) / span)
}

/// Curves for every speaking character, built in parallel per character.
#[tracing::instrument(skip_all)]
pub fn build_curves(
    timeline: &Timeline,
    characters: &CharacterMap,
    table: &VisemeTable,
) -> VisemixResult<Vec<CharacterCurves>> {
    let fps = timeline.fps();
    let default_ramp = timeline.timing().ramp_fraction;

    timeline
        .speakers()
        .into_par_iter()
        .map(|name| {
            let character = characters.get(name)?;
            let profile = &character.profile;
            let ramp = profile.ramp_fraction.unwrap_or(default_ramp);

            let mut phonemes: Vec<Phoneme> = timeline
                .beats()
                .iter()
                .filter(|b| b.speaker.as_deref() == Some(name))
                .flat_map(|b| b.absolute_phonemes())
                .collect();
            phonemes.sort_by(|a, b| a.start.total_cmp(&b.start));

            let mut points: BTreeMap<String, Vec<Breakpoint>> = BTreeMap::new();
            for p in &phonemes {
                let channel = table.lookup(&p.symbol);
                let act = activation(p, profile.peak, ramp, fps);
                merge_into(points.entry(channel.to_string()).or_default(), &act);
            }

            debug!(character = name, phonemes = phonemes.len(), channels = points.len(), "curves built");
            let curves = points
                .into_iter()
                .map(|(channel, points)| {
                    let curve = VisemeCurve {
                        character: name.to_string(),
                        channel: channel.clone(),
                        points,
                    };
                    (channel, curve)
                })
                .collect();
            Ok(CharacterCurves {
                character: name.to_string(),
                curves,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/viseme/envelope.rs"]
mod tests;
