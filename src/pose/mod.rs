pub mod blink;
pub mod export;
pub mod smoothing;
pub mod synth;
