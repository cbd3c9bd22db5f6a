//! Random event logs for property tests.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use crate::event_log::{Event, EventLog};

const ACTIVITIES: [&str; 4] = ["A", "B", "C", "D"];

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap()
}

/// Logs of up to four cases over four activities. Resources are `r0` to
/// `r2` or the missing-resource sentinel. Ends fall within four hours, and
/// some events carry a recorded start.
pub fn arbitrary_log() -> impl Strategy<Value = EventLog> {
    let record = (
        0..4_usize,
        0..ACTIVITIES.len(),
        0..4_usize,
        0..240_i64,
        prop::option::of(0..90_i64),
    );
    prop::collection::vec(record, 0..24).prop_map(|records| {
        records
            .into_iter()
            .map(|(case, activity, resource, minute, lead)| {
                let resource = if resource == 3 {
                    "NOT_SET".to_string()
                } else {
                    format!("r{resource}")
                };
                let end = origin() + TimeDelta::minutes(minute);
                let event = Event::new(format!("c{case}"), ACTIVITIES[activity], resource, end);
                match lead {
                    Some(lead) => event.with_start(end - TimeDelta::minutes(lead)),
                    None => event,
                }
            })
            .collect()
    })
}
