/// One exponential-smoothing transition for a single channel.
///
/// `factor` 0 follows the target instantly, 1 holds the previous value forever.
pub fn smooth_step(prev: f64, target: f64, factor: f64) -> f64 {
    let f = factor.clamp(0.0, 1.0);
    (prev * f + target * (1.0 - f)).clamp(0.0, 1.0)
}

/// Per-channel accumulator threaded through a frame-ordered walk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmoothingState {
    values: Vec<f64>,
}

impl SmoothingState {
    /// All channels start at rest.
    pub fn new(channels: usize) -> Self {
        Self {
            values: vec![0.0; channels],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Advance every channel one frame toward `targets`.
    pub fn step(&mut self, targets: &[f64], factor: f64) -> &[f64] {
        for (v, &t) in self.values.iter_mut().zip(targets) {
            *v = smooth_step(*v, t, factor);
        }
        &self.values
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pose/smoothing.rs"]
mod tests;
