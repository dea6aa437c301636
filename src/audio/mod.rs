pub mod clip;
pub mod mix;
