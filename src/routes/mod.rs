pub mod cafes;
pub mod export;
