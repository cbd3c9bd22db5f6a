//! Start time estimation.
//!
//! # Algorithm
//!
//! 1. Seed instant activities (start = end) and, if configured, recorded start times
//! 2. For every other event, in parallel per trace: the estimate is the later of
//!    its enablement and its resource availability, unknown values losing
//! 3. If an outlier threshold is set, clip durations over `threshold × statistic`
//!    of their activity
//! 4. Resolve events still without estimate with the re-estimation method
//!
//! Mining (concurrency relation, resource calendars) happens once in
//! [`StartTimeEstimator::new`]; estimation only reads it and never mutates the
//! input log.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::availability::ResourceAvailability;
use crate::concurrency::ConcurrencyOracle;
use crate::config::{ConfigError, Configuration, ReEstimationMethod};
use crate::event_log::{Event, EventLog, Trace};

/// The rule that produced an estimated start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Recorded start time, reused as is.
    Recorded,
    /// Instant activity or zero-duration fallback.
    Instant,
    /// End of the latest causal predecessor.
    Enablement,
    /// End of the previous work of the resource.
    Availability,
    /// Shortened to the outlier limit of its activity.
    OutlierClipped,
    /// Typical duration of its activity.
    ReEstimated,
}

impl EstimateSource {
    pub const ALL: [Self; 6] = [
        Self::Recorded,
        Self::Instant,
        Self::Enablement,
        Self::Availability,
        Self::OutlierClipped,
        Self::ReEstimated,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Instant => "instant",
            Self::Enablement => "enablement",
            Self::Availability => "availability",
            Self::OutlierClipped => "outlier_clipped",
            Self::ReEstimated => "re_estimated",
        }
    }
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived timestamps of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventEstimate {
    /// End of the latest causal predecessor, if known.
    pub enabled: Option<DateTime<Utc>>,
    /// End of the previous work of the resource, if known.
    pub available: Option<DateTime<Utc>>,
    /// Estimated start.
    pub start: DateTime<Utc>,
    /// How `start` was obtained.
    pub source: EstimateSource,
}

impl ReEstimationMethod {
    /// Duration assigned to an event with no causal nor resource signal,
    /// given the resolved durations of its activity.
    ///
    /// Zero for [`ReEstimationMethod::SetInstant`] or when nothing was observed.
    pub fn duration(self, observed: &[TimeDelta]) -> TimeDelta {
        self.statistic()
            .and_then(|statistic| statistic.apply(observed))
            .unwrap_or_else(TimeDelta::zero)
    }
}

/// Estimation state of one event while the passes run.
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    enabled: Option<DateTime<Utc>>,
    available: Option<DateTime<Utc>>,
    resolved: Option<(DateTime<Utc>, EstimateSource)>,
}

/// Estimates start times of the events of one log.
#[derive(Debug)]
pub struct StartTimeEstimator<'a> {
    log: &'a EventLog,
    config: &'a Configuration,
    traces: Vec<Trace<'a>>,
    oracle: ConcurrencyOracle,
    availability: ResourceAvailability,
}

impl<'a> StartTimeEstimator<'a> {
    /// Validates `config` and mines the concurrency oracle and resource
    /// calendars from `log`.
    pub fn new(log: &'a EventLog, config: &'a Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        let availability = ResourceAvailability::new(log, config)?;
        let traces = log.traces();
        let oracle = ConcurrencyOracle::new(&traces, config);

        Ok(Self {
            log,
            config,
            traces,
            oracle,
            availability,
        })
    }

    pub const fn oracle(&self) -> &ConcurrencyOracle {
        &self.oracle
    }

    pub const fn availability(&self) -> &ResourceAvailability {
        &self.availability
    }

    /// Runs every estimation pass and returns the estimates, one per event.
    pub fn estimate(&self) -> EstimatedLog<'a> {
        let mut slots = self.seed();
        self.estimate_traces(&mut slots);
        if let Some(threshold) = self.config.outlier_threshold {
            self.clip_outliers(&mut slots, threshold);
        }
        self.re_estimate_unresolved(&mut slots);

        let estimates = slots
            .into_iter()
            .zip(self.log.events())
            .map(|(slot, event)| {
                let (start, source) = slot
                    .resolved
                    .unwrap_or((event.end, EstimateSource::Instant));
                EventEstimate {
                    enabled: slot.enabled,
                    available: slot.available,
                    start,
                    source,
                }
            })
            .collect();

        EstimatedLog {
            log: self.log,
            estimates,
        }
    }

    fn seed(&self) -> Vec<Slot> {
        self.log
            .events()
            .iter()
            .map(|event| {
                if self.config.is_instant(&event.activity) {
                    return Slot {
                        enabled: Some(event.end),
                        available: Some(event.end),
                        resolved: Some((event.end, EstimateSource::Instant)),
                    };
                }
                match event.start {
                    Some(start) if self.config.reuse_current_start_times => Slot {
                        resolved: Some((start, EstimateSource::Recorded)),
                        ..Slot::default()
                    },
                    _ => Slot::default(),
                }
            })
            .collect()
    }

    fn estimate_traces(&self, slots: &mut [Slot]) {
        let pending: &[Slot] = slots;
        let updates: Vec<Vec<(usize, Slot)>> = self
            .traces
            .par_iter()
            .map(|trace| {
                trace
                    .indexed()
                    .filter(|(index, _)| pending[*index].resolved.is_none())
                    .map(|(index, event)| (index, self.estimate_event(trace, event)))
                    .collect()
            })
            .collect();

        let mut unresolved = 0_usize;
        for (index, slot) in updates.into_iter().flatten() {
            if slot.resolved.is_none() {
                unresolved += 1;
            }
            slots[index] = slot;
        }

        tracing::debug!(
            cases = self.traces.len(),
            unresolved,
            "estimated enablement and availability"
        );
    }

    fn estimate_event(&self, trace: &Trace<'_>, event: &Event) -> Slot {
        let enabled = self.oracle.enabled_since(trace, event);
        let available = self.availability.available_since(&event.resource, event);
        // `None` orders below every timestamp, so unknown signals never win.
        let resolved = enabled.max(available).map(|start| {
            let source = if available > enabled {
                EstimateSource::Availability
            } else {
                EstimateSource::Enablement
            };
            (start, source)
        });

        Slot {
            enabled,
            available,
            resolved,
        }
    }

    /// Resolved durations of every activity, in record order.
    fn resolved_durations(&self, slots: &[Slot]) -> HashMap<&'a str, Vec<TimeDelta>> {
        let mut durations: HashMap<&'a str, Vec<TimeDelta>> = HashMap::new();
        for (event, slot) in self.log.events().iter().zip(slots) {
            if let Some((start, _)) = slot.resolved {
                durations
                    .entry(event.activity.as_str())
                    .or_default()
                    .push(event.end - start);
            }
        }
        durations
    }

    fn clip_outliers(&self, slots: &mut [Slot], threshold: f64) {
        let statistic = self.config.outlier_statistic;
        let limits: HashMap<&str, TimeDelta> = self
            .resolved_durations(slots)
            .into_iter()
            .filter_map(|(activity, durations)| {
                statistic
                    .apply(&durations)
                    .map(|typical| (activity, scale(typical, threshold)))
            })
            .collect();

        let mut clipped = 0_usize;
        for (event, slot) in self.log.events().iter().zip(slots.iter_mut()) {
            let Some((start, source)) = slot.resolved else {
                continue;
            };
            if source == EstimateSource::Recorded {
                continue;
            }
            let Some(limit) = limits.get(event.activity.as_str()) else {
                continue;
            };
            if event.end - start > *limit {
                slot.resolved = Some((event.end - *limit, EstimateSource::OutlierClipped));
                clipped += 1;
            }
        }

        tracing::debug!(%statistic, threshold, clipped, "clipped outlier durations");
    }

    fn re_estimate_unresolved(&self, slots: &mut [Slot]) {
        let method = self.config.re_estimation_method;
        let observed = self.resolved_durations(slots);

        let mut re_estimated = 0_usize;
        for (event, slot) in self.log.events().iter().zip(slots.iter_mut()) {
            if slot.resolved.is_some() {
                continue;
            }
            let duration = observed
                .get(event.activity.as_str())
                .map_or_else(TimeDelta::zero, |durations| method.duration(durations));
            let source = if duration.is_zero() {
                EstimateSource::Instant
            } else {
                EstimateSource::ReEstimated
            };
            slot.resolved = Some((event.end - duration, source));
            re_estimated += 1;
        }

        tracing::debug!(%method, re_estimated, "re-estimated events without signal");
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "outlier limits are far below the i64 millisecond range"
)]
fn scale(duration: TimeDelta, factor: f64) -> TimeDelta {
    TimeDelta::milliseconds((duration.num_milliseconds() as f64 * factor).round() as i64)
}

/// An event log paired with the estimates of its events.
#[derive(Debug, Clone)]
pub struct EstimatedLog<'a> {
    log: &'a EventLog,
    estimates: Vec<EventEstimate>,
}

impl<'a> EstimatedLog<'a> {
    pub const fn log(&self) -> &'a EventLog {
        self.log
    }

    /// Estimates indexed by record.
    pub fn estimates(&self) -> &[EventEstimate] {
        &self.estimates
    }

    /// Events with their estimates, in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Event, &EventEstimate)> {
        self.log.events().iter().zip(&self.estimates)
    }

    /// Number of events per estimate source.
    pub fn summary(&self) -> EstimationSummary {
        let mut counts = BTreeMap::new();
        for estimate in &self.estimates {
            *counts.entry(estimate.source).or_insert(0) += 1;
        }
        EstimationSummary { counts }
    }
}

/// How many events each rule resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EstimationSummary {
    counts: BTreeMap<EstimateSource, usize>,
}

impl EstimationSummary {
    pub fn count(&self, source: EstimateSource) -> usize {
        self.counts.get(&source).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Every source with its count, zero counts included.
    pub fn iter(&self) -> impl Iterator<Item = (EstimateSource, usize)> + '_ {
        EstimateSource::ALL
            .into_iter()
            .map(|source| (source, self.count(source)))
    }
}
