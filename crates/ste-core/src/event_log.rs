//! In-memory event log: activity instances grouped into traces.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

/// One recorded activity instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identifier of the case (process execution) the event belongs to.
    pub case_id: String,
    /// Label of the executed activity.
    pub activity: String,
    /// Resource that executed the activity, or the missing-resource sentinel.
    pub resource: String,
    /// Recorded start, if the source log has one.
    pub start: Option<DateTime<Utc>>,
    /// Recorded end. Never modified by the estimation.
    pub end: DateTime<Utc>,
    /// Every other field of the source record, in source order.
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(
        case_id: impl Into<String>,
        activity: impl Into<String>,
        resource: impl Into<String>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            activity: activity.into(),
            resource: resource.into(),
            start: None,
            end,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Value of a passthrough attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An event log, kept in source record order.
///
/// The position of an event in [`EventLog::events`] is its record index. It
/// breaks ties between events of a trace with equal end timestamps and keys
/// every per-event result of the estimation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub const fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distinct activity labels, sorted.
    pub fn activities(&self) -> BTreeSet<&str> {
        self.events.iter().map(|e| e.activity.as_str()).collect()
    }

    /// Groups events by case, in order of first appearance of each case.
    ///
    /// Events inside each trace are ordered by end timestamp, ties broken by
    /// record index.
    pub fn traces(&self) -> Vec<Trace<'_>> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut traces: Vec<Trace<'_>> = Vec::new();

        for (index, event) in self.events.iter().enumerate() {
            let position = *positions.entry(event.case_id.as_str()).or_insert_with(|| {
                traces.push(Trace {
                    case_id: event.case_id.as_str(),
                    events: Vec::new(),
                });
                traces.len() - 1
            });
            traces[position].events.push((index, event));
        }

        for trace in &mut traces {
            trace.events.sort_by_key(|(index, event)| (event.end, *index));
        }

        traces
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// The events of one case, ordered by end timestamp.
#[derive(Debug, Clone)]
pub struct Trace<'a> {
    case_id: &'a str,
    events: Vec<(usize, &'a Event)>,
}

impl<'a> Trace<'a> {
    pub const fn case_id(&self) -> &'a str {
        self.case_id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in traversal order.
    pub fn events(&self) -> impl Iterator<Item = &'a Event> + '_ {
        self.events.iter().map(|(_, event)| *event)
    }

    /// Events in traversal order, with their record index in the log.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &'a Event)> + '_ {
        self.events.iter().copied()
    }

    /// Activity labels in traversal order.
    pub fn activities(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.events().map(|event| event.activity.as_str())
    }

    /// Earliest recorded timestamp of the trace, start or end.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.events()
            .flat_map(|event| event.start.into_iter().chain(std::iter::once(event.end)))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    #[test]
    fn test_traces_follow_first_appearance_of_cases() {
        let log = EventLog::new(vec![
            Event::new("c2", "A", "r1", ts(0)),
            Event::new("c1", "A", "r1", ts(1)),
            Event::new("c2", "B", "r1", ts(2)),
        ]);

        let traces = log.traces();
        let cases: Vec<_> = traces.iter().map(Trace::case_id).collect();
        assert_eq!(cases, vec!["c2", "c1"]);
        assert_eq!(traces[0].len(), 2);
        assert_eq!(traces[1].len(), 1);
    }

    #[test]
    fn test_trace_events_are_sorted_by_end_then_record_order() {
        let log = EventLog::new(vec![
            Event::new("c1", "C", "r1", ts(10)),
            Event::new("c1", "B", "r1", ts(5)),
            Event::new("c1", "A", "r1", ts(0)),
            Event::new("c1", "D", "r1", ts(5)),
        ]);

        let traces = log.traces();
        let order: Vec<_> = traces[0].activities().collect();
        assert_eq!(order, vec!["A", "B", "D", "C"]);

        let indexes: Vec<_> = traces[0].indexed().map(|(index, _)| index).collect();
        assert_eq!(indexes, vec![2, 1, 3, 0]);
    }

    #[test]
    fn test_trace_start_time_considers_recorded_starts() {
        let log = EventLog::new(vec![
            Event::new("c1", "A", "r1", ts(10)),
            Event::new("c1", "B", "r1", ts(20)).with_start(ts(3)),
        ]);
        assert_eq!(log.traces()[0].start_time(), Some(ts(3)));
    }

    #[test]
    fn test_activities_are_distinct_and_sorted() {
        let log: EventLog = ["B", "A", "B"]
            .iter()
            .enumerate()
            .map(|(i, activity)| Event::new("c1", *activity, "r1", ts(i64::try_from(i).unwrap())))
            .collect();
        assert_eq!(log.activities().into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_attributes_are_looked_up_by_name() {
        let event = Event::new("c1", "A", "r1", ts(0)).with_attribute("cost", "12");
        assert_eq!(event.attribute("cost"), Some("12"));
        assert_eq!(event.attribute("missing"), None);
    }
}
