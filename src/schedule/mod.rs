pub mod anchor;
pub mod config;
pub mod icon;
pub mod ops;
