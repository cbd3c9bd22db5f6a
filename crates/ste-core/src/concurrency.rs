//! Concurrency oracles and enablement.
//!
//! An oracle mines which activities may run concurrently. Concurrent
//! activities are not causal predecessors of each other, so they are skipped
//! when looking for the moment an activity instance became enabled.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ConcurrencyOracleType, Configuration, HeuristicsThresholds};
use crate::event_log::{Event, EventLog, Trace};
use crate::relations::{DirectlyFollows, HeuristicsMatrices};

/// Symmetric, irreflexive "concurrent with" relation over activity labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConcurrencyRelation {
    concurrent: BTreeMap<String, BTreeSet<String>>,
}

impl ConcurrencyRelation {
    /// Relation with every activity concurrent to nothing.
    pub fn empty<'a>(activities: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            concurrent: activities
                .into_iter()
                .map(|activity| (activity.to_string(), BTreeSet::new()))
                .collect(),
        }
    }

    /// Relates every unordered pair of distinct activities that satisfies
    /// `is_concurrent`. The predicate is evaluated once per pair and both
    /// directions are recorded, so the result is symmetric.
    pub fn from_pairs<'a, F>(activities: &BTreeSet<&'a str>, mut is_concurrent: F) -> Self
    where
        F: FnMut(&'a str, &'a str) -> bool,
    {
        let mut relation = Self::empty(activities.iter().copied());
        for (position, &a) in activities.iter().enumerate() {
            for &b in activities.iter().skip(position + 1) {
                if is_concurrent(a, b) {
                    relation.insert(a, b);
                }
            }
        }
        relation
    }

    fn insert(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.concurrent
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.concurrent
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    /// Activities concurrent with `activity`.
    pub fn concurrent_with(&self, activity: &str) -> impl Iterator<Item = &str> {
        self.concurrent
            .get(activity)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn are_concurrent(&self, a: &str, b: &str) -> bool {
        self.concurrent
            .get(a)
            .is_some_and(|concurrent| concurrent.contains(b))
    }

    /// Every activity with the set of activities concurrent with it.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.concurrent
            .iter()
            .map(|(activity, concurrent)| (activity.as_str(), concurrent))
    }

    /// Number of unordered concurrent pairs.
    pub fn pair_count(&self) -> usize {
        self.concurrent.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}

/// Decides when an activity instance was enabled within its trace.
#[derive(Debug, Clone)]
pub struct ConcurrencyOracle {
    kind: ConcurrencyOracleType,
    relation: ConcurrencyRelation,
    consider_start_times: bool,
}

impl ConcurrencyOracle {
    /// Mines the oracle selected in `config` from `traces`.
    pub fn new(traces: &[Trace<'_>], config: &Configuration) -> Self {
        let activities: BTreeSet<&str> =
            traces.iter().flat_map(|trace| trace.activities()).collect();

        let relation = match config.concurrency_oracle {
            ConcurrencyOracleType::Deactivated => ConcurrencyRelation::default(),
            ConcurrencyOracleType::None => ConcurrencyRelation::empty(activities.iter().copied()),
            ConcurrencyOracleType::Alpha => {
                let df = DirectlyFollows::from_traces(traces);
                ConcurrencyRelation::from_pairs(&activities, |a, b| df.in_both_directions(a, b))
            }
            ConcurrencyOracleType::Heuristics => {
                let thresholds = &config.heuristics_thresholds;
                let matrices = HeuristicsMatrices::from_traces(traces, thresholds);
                ConcurrencyRelation::from_pairs(&activities, |a, b| {
                    heuristics_concurrent(&matrices, thresholds, a, b)
                })
            }
        };

        tracing::debug!(
            oracle = %config.concurrency_oracle,
            activities = activities.len(),
            concurrent_pairs = relation.pair_count(),
            "mined concurrency relation"
        );

        Self {
            kind: config.concurrency_oracle,
            relation,
            consider_start_times: config.consider_start_times,
        }
    }

    /// Mines the oracle selected in `config` from the traces of `log`.
    pub fn from_log(log: &EventLog, config: &Configuration) -> Self {
        Self::new(&log.traces(), config)
    }

    pub const fn kind(&self) -> ConcurrencyOracleType {
        self.kind
    }

    pub const fn relation(&self) -> &ConcurrencyRelation {
        &self.relation
    }

    /// Latest end of a causal predecessor of `event` in `trace`.
    ///
    /// Predecessors are the events of the trace ending strictly before
    /// `event`, whose activity is not concurrent with it. When start times are
    /// considered and `event` has a recorded start, events ending after that
    /// start overlap it and are skipped too. `None` when no predecessor
    /// qualifies or the oracle is deactivated.
    pub fn enabled_since(&self, trace: &Trace<'_>, event: &Event) -> Option<DateTime<Utc>> {
        if self.kind == ConcurrencyOracleType::Deactivated {
            return None;
        }
        trace
            .events()
            .filter(|other| other.end < event.end)
            .filter(|other| {
                !self.consider_start_times || event.start.is_none_or(|start| other.end <= start)
            })
            .filter(|other| !self.relation.are_concurrent(&event.activity, &other.activity))
            .map(|other| other.end)
            .max()
    }

    /// Enabled time of every event of `log`, indexed by record.
    ///
    /// With `unknown_as_trace_start`, events without an enabling predecessor
    /// get the start of their trace instead of `None`.
    pub fn enabled_times(
        &self,
        log: &EventLog,
        unknown_as_trace_start: bool,
    ) -> Vec<Option<DateTime<Utc>>> {
        let mut enabled = vec![None; log.len()];
        for trace in log.traces() {
            let trace_start = trace.start_time();
            for (index, event) in trace.indexed() {
                let since = self.enabled_since(&trace, event);
                enabled[index] = if unknown_as_trace_start {
                    since.or(trace_start)
                } else {
                    since
                };
            }
        }
        enabled
    }
}

fn heuristics_concurrent(
    matrices: &HeuristicsMatrices,
    thresholds: &HeuristicsThresholds,
    a: &str,
    b: &str,
) -> bool {
    matrices.directly_follows().in_both_directions(a, b)
        && matrices.l2l_dependency(a, b) < thresholds.l2l
        && matrices.df_dependency(a, b).abs() < thresholds.df
}
