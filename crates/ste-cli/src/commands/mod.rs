//! CLI subcommand implementations.

pub mod concurrency;
pub mod enabled;
pub mod estimate;
