//! Central tendency of duration distributions.
//!
//! Durations are handled at millisecond resolution, the finest resolution of
//! the timestamps written back to logs.

use std::collections::HashMap;

use chrono::TimeDelta;

use crate::config::Statistic;

impl Statistic {
    /// Applies the statistic to `durations`. `None` when empty.
    ///
    /// The mode of a multimodal distribution is the most frequent value that
    /// appears first in `durations`. The median of an even number of values
    /// is the mean of the two middle ones.
    pub fn apply(self, durations: &[TimeDelta]) -> Option<TimeDelta> {
        if durations.is_empty() {
            return None;
        }
        let millis: Vec<i64> = durations.iter().map(TimeDelta::num_milliseconds).collect();
        let value = match self {
            Self::Mode => mode(&millis),
            Self::Median => median(millis),
            Self::Mean => mean(&millis),
        };
        Some(TimeDelta::milliseconds(value))
    }
}

fn mode(values: &[i64]) -> i64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    let highest = counts.values().copied().max().unwrap_or(0);
    values
        .iter()
        .copied()
        .find(|value| counts.get(value) == Some(&highest))
        .unwrap_or_default()
}

fn median(mut values: Vec<i64>) -> i64 {
    values.sort_unstable();
    let middle = values.len() / 2;
    if values.len() % 2 == 1 {
        values[middle]
    } else {
        midpoint(values[middle - 1], values[middle])
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the mean of i64 values fits in i64"
)]
fn mean(values: &[i64]) -> i64 {
    let sum: i128 = values.iter().map(|value| i128::from(*value)).sum();
    let count = i128::try_from(values.len()).unwrap_or(i128::MAX);
    (sum / count) as i64
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the midpoint of two i64 values fits in i64"
)]
fn midpoint(a: i64, b: i64) -> i64 {
    ((i128::from(a) + i128::from(b)) / 2) as i64
}
