//! XES documents, parsed and exported through `process_mining`.

use std::path::Path;

use chrono::{DateTime, Utc};
use process_mining::event_log::event_log_struct::{Attribute, AttributeValue, Attributes};
use process_mining::{EventLog as XesLog, XESImportOptions};
use ste_core::{Configuration, Event, EventLog};

use crate::LogError;
use crate::reader::TabularLog;
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::writer::{Column, Derived};

/// Trace attributes are flattened under this prefix.
const CASE_PREFIX: &str = "case:";

/// The document a log was read from, restricted to the events the reader
/// kept.
#[derive(Debug, Clone)]
pub struct XesSource {
    log: XesLog,
    /// Trace and event position of every record, by record index.
    positions: Vec<(usize, usize)>,
}

/// Key of the case identifier among the trace attributes.
fn trace_key(case: &str) -> &str {
    case.strip_prefix(CASE_PREFIX).unwrap_or(case)
}

fn find<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a AttributeValue> {
    attributes
        .iter()
        .find(|attribute| attribute.key == key)
        .map(|attribute| &attribute.value)
}

fn render(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(value) => value.clone(),
        AttributeValue::Date(value) => format_timestamp(value.with_timezone(&Utc)),
        AttributeValue::Int(value) => value.to_string(),
        AttributeValue::Float(value) => value.to_string(),
        AttributeValue::Boolean(value) => value.to_string(),
        _ => String::new(),
    }
}

fn timestamp(value: &AttributeValue) -> Option<DateTime<Utc>> {
    match value {
        AttributeValue::Date(value) => Some(value.with_timezone(&Utc)),
        AttributeValue::String(value) => parse_timestamp(value),
        _ => None,
    }
}

fn is_blank(value: &AttributeValue) -> bool {
    matches!(value, AttributeValue::String(text) if text.trim().is_empty())
}

fn note_column(columns: &mut Vec<String>, name: &str) {
    if !columns.iter().any(|column| column == name) {
        columns.push(name.to_string());
    }
}

/// Reads an XES document, gzip-compressed when `compressed` is set.
///
/// Events carrying a lifecycle other than `complete` are dropped. Events
/// without a resource get the missing-resource sentinel, in the returned log
/// and in the retained document alike.
pub fn read_xes_log_from(
    bytes: &[u8],
    compressed: bool,
    config: &Configuration,
) -> Result<TabularLog, LogError> {
    let mut source =
        process_mining::import_xes_slice(bytes, compressed, XESImportOptions::default())
            .map_err(|error| LogError::Xes(format!("{error:?}")))?;

    let ids = &config.log_ids;
    let case_key = trace_key(&ids.case);
    let reserved = ids.reserved();
    let passthrough = |key: &str| {
        !reserved.contains(&key) && ids.estimate_source.as_deref() != Some(key)
    };

    let mut columns = vec![ids.case.clone()];
    let mut events = Vec::new();
    let mut positions = Vec::new();
    let mut skipped = 0_usize;

    for (trace_index, trace) in source.traces.iter_mut().enumerate() {
        let case_id = find(&trace.attributes, case_key).map(render).ok_or_else(|| {
            LogError::InvalidAttribute {
                location: format!("trace {trace_index}"),
                attribute: case_key.to_string(),
            }
        })?;
        let case_attributes: Vec<(String, String)> = trace
            .attributes
            .iter()
            .filter(|attribute| attribute.key != case_key)
            .map(|attribute| {
                (format!("{CASE_PREFIX}{}", attribute.key), render(&attribute.value))
            })
            .collect();
        for (name, _) in &case_attributes {
            note_column(&mut columns, name);
        }

        let before = trace.events.len();
        trace.events.retain(|event| {
            find(&event.attributes, &ids.lifecycle)
                .is_none_or(|value| render(value).eq_ignore_ascii_case("complete"))
        });
        skipped += before - trace.events.len();

        for (event_index, xes_event) in trace.events.iter_mut().enumerate() {
            if find(&xes_event.attributes, &ids.resource).is_none() {
                xes_event.attributes.push(Attribute::new(
                    ids.resource.clone(),
                    AttributeValue::String(config.missing_resource.clone()),
                ));
            }
            let attributes = &xes_event.attributes;
            let invalid = |attribute: &str| LogError::InvalidAttribute {
                location: format!("case '{case_id}'"),
                attribute: attribute.to_string(),
            };

            let activity = find(attributes, &ids.activity)
                .map(render)
                .ok_or_else(|| invalid(&ids.activity))?;
            let resource = find(attributes, &ids.resource)
                .map(render)
                .filter(|resource| !resource.is_empty())
                .unwrap_or_else(|| config.missing_resource.clone());
            let end = find(attributes, &ids.end_time)
                .and_then(timestamp)
                .ok_or_else(|| invalid(&ids.end_time))?;

            let mut event = Event::new(case_id.as_str(), activity, resource, end);
            let start = find(attributes, &ids.start_time).filter(|value| !is_blank(value));
            if let Some(value) = start {
                event.start = Some(timestamp(value).ok_or_else(|| invalid(&ids.start_time))?);
            }
            event.attributes.clone_from(&case_attributes);
            for attribute in attributes {
                note_column(&mut columns, &attribute.key);
                if passthrough(&attribute.key) {
                    event
                        .attributes
                        .push((attribute.key.clone(), render(&attribute.value)));
                }
            }

            events.push(event);
            positions.push((trace_index, event_index));
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "dropped events with a lifecycle other than complete");
    }

    Ok(TabularLog {
        columns,
        log: EventLog::new(events),
        xes: Some(XesSource {
            log: source,
            positions,
        }),
    })
}

impl Column<'_> {
    /// Typed attribute value of a derived column, `None` when unknown.
    fn attribute_value(self, derived: &Derived) -> Option<AttributeValue> {
        let date = |timestamp: Option<DateTime<Utc>>| {
            timestamp.map(|timestamp| AttributeValue::Date(timestamp.fixed_offset()))
        };
        match self {
            Self::Enabled => date(derived.enabled),
            Self::Available => date(derived.available),
            Self::EstimatedStart => date(derived.estimated_start),
            Self::Source => derived
                .source
                .map(|source| AttributeValue::String(source.as_str().to_string())),
            _ => None,
        }
    }
}

/// Replaces the attribute `key`, or drops it when `value` is unknown.
fn set_attribute(attributes: &mut Attributes, key: &str, value: Option<AttributeValue>) {
    attributes.retain(|attribute| attribute.key != key);
    if let Some(value) = value {
        attributes.push(Attribute::new(key.to_string(), value));
    }
}

/// Writes the source document of `table` with the derived values of every
/// record set as event attributes. The output is gzip-compressed when the
/// name ends with `.gz`.
pub fn write_xes_log(
    path: &Path,
    table: &TabularLog,
    derived: &[(&str, Column<'_>)],
    rows: impl Iterator<Item = Derived>,
) -> Result<(), LogError> {
    let Some(source) = &table.xes else {
        return Err(LogError::XesOutputWithoutXesInput(path.to_path_buf()));
    };
    let mut log = source.log.clone();
    for ((trace, event), values) in source.positions.iter().zip(rows) {
        let attributes = &mut log.traces[*trace].events[*event].attributes;
        for (name, column) in derived {
            set_attribute(attributes, name, column.attribute_value(&values));
        }
    }

    process_mining::export_xes_event_log_to_file_path(&log, path)
        .map_err(|error| LogError::Xes(format!("{error:?}")))
}
