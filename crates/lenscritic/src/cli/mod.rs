//! Command implementations.

pub mod config;
pub mod critique;
pub mod models;
pub mod prompt;
pub mod types;
