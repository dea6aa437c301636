pub mod compositor;
pub mod pixels;
