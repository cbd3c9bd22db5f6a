//! Core domain logic for start time estimation.
//!
//! This crate contains the fundamental types and logic for:
//! - Configuration: oracle, availability and re-estimation selectors
//! - Concurrency mining: which activities of a log run in parallel
//! - Resource availability: when each resource finished its previous work
//! - Estimation: start times from the later of enablement and availability

mod availability;
pub mod concurrency;
pub mod config;
mod estimator;
pub mod event_log;
pub mod relations;
mod stats;
#[cfg(test)]
mod testing;

pub use availability::ResourceAvailability;
pub use concurrency::{ConcurrencyOracle, ConcurrencyRelation};
pub use config::{
    ConcurrencyOracleType, ConfigError, Configuration, EventLogIds, HeuristicsThresholds,
    ReEstimationMethod, ResourceAvailabilityType, Statistic,
};
pub use estimator::{
    EstimateSource, EstimatedLog, EstimationSummary, EventEstimate, StartTimeEstimator,
};
pub use event_log::{Event, EventLog, Trace};
