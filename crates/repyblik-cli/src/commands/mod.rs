//! Subcommand implementations.

pub mod articles;
pub mod token;
