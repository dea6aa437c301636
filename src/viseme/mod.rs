pub mod envelope;
pub mod table;
