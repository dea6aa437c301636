pub mod characters;
pub mod document;
pub mod model;
