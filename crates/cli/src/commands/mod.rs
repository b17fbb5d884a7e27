//! Subcommand implementations

pub mod mission;
pub mod session;
pub mod stats;
