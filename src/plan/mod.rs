pub mod logic;
pub mod repo;
