pub mod migration;
pub mod persistence;
pub mod tables;
