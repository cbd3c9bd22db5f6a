//! Behavioral relations mined from an event log.
//!
//! Directly-follows counts feed every concurrency oracle. The heuristics oracle
//! additionally uses dependency measures derived from them:
//!
//! - directly-follows dependency `(|A>B| - |B>A|) / (|A>B| + |B>A| + 1)`
//! - length-1-loop strength `|A>A| / (|A>A| + 1)`
//! - length-2-loop dependency `(|ABA| + |BAB|) / (|ABA| + |BAB| + 1)`, only
//!   when neither activity has a strong self-loop

use std::collections::HashMap;

use crate::config::HeuristicsThresholds;
use crate::event_log::{EventLog, Trace};

type CountMatrix = HashMap<String, HashMap<String, u64>>;

fn increment(matrix: &mut CountMatrix, from: &str, to: &str) {
    *matrix
        .entry(from.to_string())
        .or_default()
        .entry(to.to_string())
        .or_insert(0) += 1;
}

fn lookup(matrix: &CountMatrix, from: &str, to: &str) -> u64 {
    matrix
        .get(from)
        .and_then(|row| row.get(to))
        .copied()
        .unwrap_or(0)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "relation counts stay far below 2^52"
)]
fn as_f64(count: u64) -> f64 {
    count as f64
}

/// Number of times each activity directly follows another within a trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectlyFollows {
    counts: CountMatrix,
}

impl DirectlyFollows {
    /// Counts adjacent pairs of every trace.
    pub fn from_traces(traces: &[Trace<'_>]) -> Self {
        let mut counts = CountMatrix::new();
        for trace in traces {
            let activities: Vec<&str> = trace.activities().collect();
            for pair in activities.windows(2) {
                increment(&mut counts, pair[0], pair[1]);
            }
        }
        Self { counts }
    }

    /// Times `to` directly followed `from`.
    pub fn count(&self, from: &str, to: &str) -> u64 {
        lookup(&self.counts, from, to)
    }

    /// Whether `a` followed `b` and `b` followed `a` at least once each.
    pub fn in_both_directions(&self, a: &str, b: &str) -> bool {
        self.count(a, b) > 0 && self.count(b, a) > 0
    }
}

/// Counts directly-follows relations over the traces of `log`.
pub fn directly_follows_counts(log: &EventLog) -> DirectlyFollows {
    DirectlyFollows::from_traces(&log.traces())
}

/// Dependency measures of the heuristics miner.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicsMatrices {
    directly_follows: DirectlyFollows,
    /// `l2l[A][B]`: times a trace went A, B, A.
    l2l_counts: CountMatrix,
    l1l_threshold: f64,
}

impl HeuristicsMatrices {
    /// Mines directly-follows and length-2-loop counts from every trace.
    pub fn from_traces(traces: &[Trace<'_>], thresholds: &HeuristicsThresholds) -> Self {
        let mut l2l_counts = CountMatrix::new();
        for trace in traces {
            let activities: Vec<&str> = trace.activities().collect();
            for triple in activities.windows(3) {
                if triple[0] == triple[2] {
                    increment(&mut l2l_counts, triple[0], triple[1]);
                }
            }
        }

        Self {
            directly_follows: DirectlyFollows::from_traces(traces),
            l2l_counts,
            l1l_threshold: thresholds.l1l,
        }
    }

    pub const fn directly_follows(&self) -> &DirectlyFollows {
        &self.directly_follows
    }

    /// Certainty of a causal edge from `a` to `b`, in `(-1, 1)`.
    ///
    /// Positive values point from `a` to `b`, negative from `b` to `a`, and
    /// values near zero mean no relation or a bidirectional one.
    pub fn df_dependency(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        let ab = as_f64(self.directly_follows.count(a, b));
        let ba = as_f64(self.directly_follows.count(b, a));
        (ab - ba) / (ab + ba + 1.0)
    }

    /// Strength of the self-loop of `a`, in `[0, 1)`.
    pub fn l1l(&self, a: &str) -> f64 {
        let aa = as_f64(self.directly_follows.count(a, a));
        aa / (aa + 1.0)
    }

    /// Certainty that `a` and `b` form a length-2 loop, in `[0, 1)`.
    ///
    /// Zero when either activity has a self-loop at or above the l1l
    /// threshold, as the self-loop makes the A-B-A pattern meaningless.
    pub fn l2l_dependency(&self, a: &str, b: &str) -> f64 {
        if a == b || self.l1l(a) >= self.l1l_threshold || self.l1l(b) >= self.l1l_threshold {
            return 0.0;
        }
        let aba = as_f64(lookup(&self.l2l_counts, a, b));
        let bab = as_f64(lookup(&self.l2l_counts, b, a));
        (aba + bab) / (aba + bab + 1.0)
    }
}

/// Mines the heuristics dependency measures over the traces of `log`.
pub fn heuristics_matrices(
    log: &EventLog,
    thresholds: &HeuristicsThresholds,
) -> HeuristicsMatrices {
    HeuristicsMatrices::from_traces(&log.traces(), thresholds)
}
