pub mod overlay;
pub mod poses;
