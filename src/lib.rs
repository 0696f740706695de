pub mod config;
pub mod error;
pub mod grading;
pub mod output;
pub mod parser;
pub mod roster;
pub mod store;
