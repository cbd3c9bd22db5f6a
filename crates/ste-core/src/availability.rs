//! Resource availability from observed work.
//!
//! A resource becomes available when it finishes its previous activity
//! instance. Each resource gets a calendar with the end timestamps of
//! everything it performed, sorted so lookups are a binary search.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::config::{ConfigError, Configuration, ResourceAvailabilityType};
use crate::event_log::{Event, EventLog};

/// Per-resource calendars of completed work.
#[derive(Debug, Clone)]
pub struct ResourceAvailability {
    calendars: HashMap<String, Vec<DateTime<Utc>>>,
    missing_resource: String,
    bot_resources: BTreeSet<String>,
    consider_start_times: bool,
}

impl ResourceAvailability {
    /// Builds the calendars of every resource in `log`, bots and the
    /// missing-resource sentinel excluded.
    ///
    /// Fails for availability variants that are not implemented.
    pub fn new(log: &EventLog, config: &Configuration) -> Result<Self, ConfigError> {
        match config.resource_availability {
            ResourceAvailabilityType::Simple => {}
            unsupported @ ResourceAvailabilityType::WithCalendar => {
                return Err(ConfigError::UnsupportedResourceAvailability(unsupported));
            }
        }

        let mut calendars: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
        for event in log.events() {
            if event.resource == config.missing_resource || config.is_bot(&event.resource) {
                continue;
            }
            calendars
                .entry(event.resource.clone())
                .or_default()
                .push(event.end);
        }
        for calendar in calendars.values_mut() {
            calendar.sort_unstable();
        }

        tracing::debug!(
            resources = calendars.len(),
            bots = config.bot_resources.len(),
            "built resource calendars"
        );

        Ok(Self {
            calendars,
            missing_resource: config.missing_resource.clone(),
            bot_resources: config.bot_resources.clone(),
            consider_start_times: config.consider_start_times,
        })
    }

    /// Sorted end timestamps of the work `resource` performed.
    pub fn calendar(&self, resource: &str) -> Option<&[DateTime<Utc>]> {
        self.calendars.get(resource).map(Vec::as_slice)
    }

    /// Moment `resource` became available to perform `event`.
    ///
    /// - missing resource: `None`, availability does not constrain the event
    /// - bot resource: the end of `event` itself, bots are never busy
    /// - otherwise: the latest end in the resource's calendar strictly before
    ///   the end of `event` (and, when start times are considered, not after
    ///   its recorded start); `None` for the first work of the resource
    pub fn available_since(&self, resource: &str, event: &Event) -> Option<DateTime<Utc>> {
        if resource == self.missing_resource {
            return None;
        }
        if self.bot_resources.contains(resource) {
            return Some(event.end);
        }

        let calendar = self.calendars.get(resource)?;
        let mut bound = calendar.partition_point(|end| *end < event.end);
        if self.consider_start_times {
            if let Some(start) = event.start {
                bound = bound.min(calendar.partition_point(|end| *end <= start));
            }
        }
        bound.checked_sub(1).map(|last| calendar[last])
    }
}
