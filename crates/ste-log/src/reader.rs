use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use ste_core::{Configuration, Event, EventLog};

use crate::timestamp::parse_timestamp;
use crate::xes::{XesSource, read_xes_log_from};
use crate::{LogError, LogFormat};

/// An event log together with the header of the file it was read from.
#[derive(Debug, Clone)]
pub struct TabularLog {
    pub(crate) columns: Vec<String>,
    pub(crate) log: EventLog,
    /// Parsed document of an XES source, written back with the estimates.
    pub(crate) xes: Option<XesSource>,
}

impl TabularLog {
    /// Header of the source file, in source order. For XES sources these are
    /// the flattened attribute keys, trace attributes prefixed with `case:`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    pub const fn is_xes(&self) -> bool {
        self.xes.is_some()
    }

    pub fn into_parts(self) -> (Vec<String>, EventLog) {
        (self.columns, self.log)
    }
}

/// Reads a `.csv`, `.csv.gz`, `.xes` or `.xes.gz` event log.
pub fn read_event_log(path: &Path, config: &Configuration) -> Result<TabularLog, LogError> {
    let format = LogFormat::from_path(path)?;

    let table = if format.is_xes() {
        let bytes = std::fs::read(path).map_err(|source| LogError::io(path, source))?;
        read_xes_log_from(&bytes, format.is_compressed(), config)?
    } else {
        let file = File::open(path).map_err(|source| LogError::io(path, source))?;
        let file = BufReader::new(file);
        if format.is_compressed() {
            read_event_log_from(GzDecoder::new(file), config)?
        } else {
            read_event_log_from(file, config)?
        }
    };

    tracing::debug!(
        path = %path.display(),
        events = table.log.len(),
        columns = table.columns.len(),
        "read event log"
    );
    Ok(table)
}

/// Reads CSV records with a header row from `reader`.
///
/// Records whose lifecycle is not `complete` are dropped when the log has a
/// lifecycle column. Empty resources become the missing-resource sentinel.
pub fn read_event_log_from<R: Read>(
    reader: R,
    config: &Configuration,
) -> Result<TabularLog, LogError> {
    let ids = &config.log_ids;
    let mut csv = csv::Reader::from_reader(reader);
    let columns: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();

    let position = |name: &str| columns.iter().position(|column| column == name);
    let required =
        |name: &str| position(name).ok_or_else(|| LogError::MissingColumn(name.to_string()));
    let case = required(&ids.case)?;
    let activity = required(&ids.activity)?;
    let end = required(&ids.end_time)?;
    let resource = position(&ids.resource);
    let start = position(&ids.start_time);
    let lifecycle = position(&ids.lifecycle);

    let reserved = ids.reserved();
    let passthrough: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, column)| {
            !reserved.contains(&column.as_str())
                && ids.estimate_source.as_ref() != Some(*column)
        })
        .map(|(index, _)| index)
        .collect();

    let mut events = Vec::new();
    let mut skipped = 0_usize;
    for record in csv.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let field = |index: usize| record.get(index).unwrap_or_default().trim();

        if let Some(index) = lifecycle {
            if !field(index).eq_ignore_ascii_case("complete") {
                skipped += 1;
                continue;
            }
        }

        let timestamp = |index: usize, column: &str| -> Result<DateTime<Utc>, LogError> {
            parse_timestamp(field(index)).ok_or_else(|| LogError::InvalidTimestamp {
                line,
                column: column.to_string(),
                value: field(index).to_string(),
            })
        };

        let resource_value = resource
            .map(field)
            .filter(|value| !value.is_empty())
            .unwrap_or(config.missing_resource.as_str());
        let mut event = Event::new(
            field(case),
            field(activity),
            resource_value,
            timestamp(end, &ids.end_time)?,
        );
        if let Some(index) = start.filter(|index| !field(*index).is_empty()) {
            event.start = Some(timestamp(index, &ids.start_time)?);
        }
        event.attributes = passthrough
            .iter()
            .map(|index| {
                let value = record.get(*index).unwrap_or_default();
                (columns[*index].clone(), value.to_string())
            })
            .collect();
        events.push(event);
    }

    if skipped > 0 {
        tracing::warn!(skipped, "dropped records with a lifecycle other than complete");
    }

    Ok(TabularLog {
        columns,
        log: EventLog::new(events),
        xes: None,
    })
}
