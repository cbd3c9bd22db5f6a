//! Start time estimator CLI library.
//!
//! This crate provides the CLI interface for the start time estimator.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, EstimateArgs, FieldNames, MiningArgs};
pub use config::Config;
