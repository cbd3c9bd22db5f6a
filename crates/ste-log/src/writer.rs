use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use ste_core::{Configuration, EstimateSource, EstimatedLog, Event, EventLog, EventLogIds};

use crate::reader::TabularLog;
use crate::timestamp::format_timestamp;
use crate::xes::write_xes_log;
use crate::{LogError, LogFormat};

/// What a column of the output holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    Case,
    Activity,
    Resource,
    Start,
    End,
    Enabled,
    Available,
    EstimatedStart,
    Source,
    Attribute(&'a str),
}

/// Values computed for one event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Derived {
    pub enabled: Option<DateTime<Utc>>,
    pub available: Option<DateTime<Utc>>,
    pub estimated_start: Option<DateTime<Utc>>,
    pub source: Option<EstimateSource>,
}

fn timestamp_cell(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map(format_timestamp).unwrap_or_default()
}

impl Column<'_> {
    /// Whether the column holds a computed value rather than source data.
    const fn is_derived(self) -> bool {
        matches!(
            self,
            Self::Enabled | Self::Available | Self::EstimatedStart | Self::Source
        )
    }

    fn render(self, event: &Event, derived: &Derived) -> String {
        match self {
            Self::Case => event.case_id.clone(),
            Self::Activity => event.activity.clone(),
            Self::Resource => event.resource.clone(),
            Self::Start => timestamp_cell(event.start),
            Self::End => format_timestamp(event.end),
            Self::Enabled => timestamp_cell(derived.enabled),
            Self::Available => timestamp_cell(derived.available),
            Self::EstimatedStart => timestamp_cell(derived.estimated_start),
            Self::Source => derived
                .source
                .map(|source| source.as_str().to_string())
                .unwrap_or_default(),
            Self::Attribute(name) => event.attribute(name).unwrap_or_default().to_string(),
        }
    }
}

/// Maps the columns of the source file to their content. With `replace`, the
/// start column holds the estimate.
fn source_column<'a>(name: &'a str, ids: &EventLogIds, replace: bool) -> Column<'a> {
    if name == ids.case {
        Column::Case
    } else if name == ids.activity {
        Column::Activity
    } else if name == ids.resource {
        Column::Resource
    } else if name == ids.end_time {
        Column::End
    } else if name == ids.start_time {
        if replace {
            Column::EstimatedStart
        } else {
            Column::Start
        }
    } else {
        Column::Attribute(name)
    }
}

/// Source columns minus the ones listed in `derived`, which are re-appended
/// by the caller.
fn kept_columns<'a>(
    columns: &'a [String],
    ids: &EventLogIds,
    derived: &[&str],
    replace: bool,
) -> Vec<(&'a str, Column<'a>)> {
    columns
        .iter()
        .map(String::as_str)
        .filter(|name| !derived.contains(name))
        .map(|name| (name, source_column(name, ids, replace)))
        .collect()
}

fn estimate_layout<'a>(
    columns: &'a [String],
    config: &'a Configuration,
) -> Vec<(&'a str, Column<'a>)> {
    let ids = &config.log_ids;
    let replace = config.replace_recorded_start_times;

    let mut derived = vec![
        ids.enabled_time.as_str(),
        ids.available_time.as_str(),
        ids.estimated_start_time.as_str(),
    ];
    if let Some(name) = &ids.estimate_source {
        derived.push(name.as_str());
    }

    let mut layout = kept_columns(columns, ids, &derived, replace);
    if !columns.contains(&ids.start_time) {
        let start = if replace {
            Column::EstimatedStart
        } else {
            Column::Start
        };
        layout.push((ids.start_time.as_str(), start));
    }
    layout.push((ids.enabled_time.as_str(), Column::Enabled));
    layout.push((ids.available_time.as_str(), Column::Available));
    if !replace {
        layout.push((ids.estimated_start_time.as_str(), Column::EstimatedStart));
    }
    if let Some(name) = &ids.estimate_source {
        layout.push((name.as_str(), Column::Source));
    }
    layout
}

fn write_table<'e, W: Write>(
    writer: W,
    layout: &[(&str, Column<'_>)],
    rows: impl Iterator<Item = (&'e Event, Derived)>,
) -> Result<(), LogError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(layout.iter().map(|(name, _)| *name))?;
    for (event, derived) in rows {
        csv.write_record(layout.iter().map(|(_, column)| column.render(event, &derived)))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Only the derived columns of `layout`, which XES output sets as event
/// attributes.
fn derived_only<'a>(layout: Vec<(&'a str, Column<'a>)>) -> Vec<(&'a str, Column<'a>)> {
    layout
        .into_iter()
        .filter(|(_, column)| column.is_derived())
        .collect()
}

/// Creates `path` and hands a writer to `write`, gzip-compressed when
/// `compressed` is set.
fn write_file(
    path: &Path,
    compressed: bool,
    write: impl FnOnce(&mut dyn Write) -> Result<(), LogError>,
) -> Result<(), LogError> {
    let file = File::create(path).map_err(|source| LogError::io(path, source))?;
    let mut file = BufWriter::new(file);

    if compressed {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write(&mut encoder)?;
        encoder
            .finish()
            .and_then(|mut inner| inner.flush())
            .map_err(|source| LogError::io(path, source))?;
    } else {
        write(&mut file)?;
        file.flush().map_err(|source| LogError::io(path, source))?;
    }
    Ok(())
}

/// Writes the source columns of `estimated` followed by the enabled,
/// available and estimated start times.
///
/// Derived columns already present in `columns` are replaced, so re-running
/// on an output file does not duplicate them.
pub fn write_estimated_log_to<W: Write>(
    writer: W,
    columns: &[String],
    estimated: &EstimatedLog<'_>,
    config: &Configuration,
) -> Result<(), LogError> {
    let layout = estimate_layout(columns, config);
    write_table(writer, &layout, estimate_rows(estimated))
}

fn estimate_rows<'e>(
    estimated: &'e EstimatedLog<'_>,
) -> impl Iterator<Item = (&'e Event, Derived)> {
    estimated.iter().map(|(event, estimate)| {
        (
            event,
            Derived {
                enabled: estimate.enabled,
                available: estimate.available,
                estimated_start: Some(estimate.start),
                source: Some(estimate.source),
            },
        )
    })
}

/// Writes `estimated` to a file in the format its name gives.
///
/// XES output sets the derived timestamps as `date` attributes on the
/// events of the source document.
pub fn write_estimated_log(
    path: &Path,
    table: &TabularLog,
    estimated: &EstimatedLog<'_>,
    config: &Configuration,
) -> Result<(), LogError> {
    let format = LogFormat::from_path(path)?;
    if format.is_xes() {
        let derived = derived_only(estimate_layout(table.columns(), config));
        let rows = estimate_rows(estimated).map(|(_, derived)| derived);
        write_xes_log(path, table, &derived, rows)?;
    } else {
        write_file(path, format.is_compressed(), |writer| {
            write_estimated_log_to(writer, table.columns(), estimated, config)
        })?;
    }
    tracing::debug!(
        path = %path.display(),
        events = estimated.estimates().len(),
        "wrote estimated log"
    );
    Ok(())
}

/// Writes the source columns of `log` followed by its enabled times.
pub fn write_enabled_times_to<W: Write>(
    writer: W,
    columns: &[String],
    log: &EventLog,
    enabled: &[Option<DateTime<Utc>>],
    config: &Configuration,
) -> Result<(), LogError> {
    let layout = enabled_layout(columns, config);
    let rows = log.events().iter().zip(enabled_rows(enabled));
    write_table(writer, &layout, rows)
}

fn enabled_layout<'a>(
    columns: &'a [String],
    config: &'a Configuration,
) -> Vec<(&'a str, Column<'a>)> {
    let ids = &config.log_ids;
    let mut layout = kept_columns(columns, ids, &[ids.enabled_time.as_str()], false);
    layout.push((ids.enabled_time.as_str(), Column::Enabled));
    layout
}

fn enabled_rows(enabled: &[Option<DateTime<Utc>>]) -> impl Iterator<Item = Derived> + '_ {
    enabled.iter().map(|enabled| Derived {
        enabled: *enabled,
        ..Derived::default()
    })
}

/// Writes the enabled times of the log in `table` to a file in the format
/// its name gives.
pub fn write_enabled_times(
    path: &Path,
    table: &TabularLog,
    enabled: &[Option<DateTime<Utc>>],
    config: &Configuration,
) -> Result<(), LogError> {
    let format = LogFormat::from_path(path)?;
    if format.is_xes() {
        let derived = derived_only(enabled_layout(table.columns(), config));
        write_xes_log(path, table, &derived, enabled_rows(enabled))?;
    } else {
        write_file(path, format.is_compressed(), |writer| {
            write_enabled_times_to(writer, table.columns(), table.log(), enabled, config)
        })?;
    }
    tracing::debug!(
        path = %path.display(),
        events = table.log().len(),
        "wrote enabled times"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_event_log, read_event_log_from};
    use ste_core::StartTimeEstimator;

    const LOG: &str = "case_id,Activity,Resource,end_time,cost\n\
                       c1,A,alice,2025-01-15 09:00:00,5\n\
                       c1,B,bob,2025-01-15 09:30:00,7\n\
                       c2,A,alice,2025-01-15 09:10:00,\n";

    fn estimate_to_string(contents: &str, config: &Configuration) -> String {
        let table = read_event_log_from(contents.as_bytes(), config).unwrap();
        let estimator = StartTimeEstimator::new(table.log(), config).unwrap();
        let estimated = estimator.estimate();
        let mut output = Vec::new();
        write_estimated_log_to(&mut output, table.columns(), &estimated, config).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_appends_derived_columns_after_source_columns() {
        let output = estimate_to_string(LOG, &Configuration::default());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "case_id,Activity,Resource,end_time,cost,start_time,enabled_time,available_time,estimated_start_time"
        );
        assert_eq!(
            lines[2],
            "c1,B,bob,2025-01-15T09:30:00.000+00:00,7,,2025-01-15T09:00:00.000+00:00,,2025-01-15T09:00:00.000+00:00"
        );
        assert_eq!(
            lines[3],
            "c2,A,alice,2025-01-15T09:10:00.000+00:00,,,,2025-01-15T09:00:00.000+00:00,2025-01-15T09:00:00.000+00:00"
        );
    }

    #[test]
    fn test_replacing_writes_the_estimate_as_start() {
        let config = Configuration {
            replace_recorded_start_times: true,
            ..Configuration::default()
        };
        let output = estimate_to_string(LOG, &config);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "case_id,Activity,Resource,end_time,cost,start_time,enabled_time,available_time"
        );
        assert!(lines[2].starts_with(
            "c1,B,bob,2025-01-15T09:30:00.000+00:00,7,2025-01-15T09:00:00.000+00:00,"
        ));
    }

    #[test]
    fn test_estimate_source_column_is_optional() {
        let mut config = Configuration::default();
        config.log_ids.estimate_source = Some("source".to_string());
        let output = estimate_to_string(LOG, &config);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].ends_with(",estimated_start_time,source"));
        assert!(lines[1].ends_with(",re_estimated"));
        assert!(lines[2].ends_with(",enablement"));
        assert!(lines[3].ends_with(",availability"));
    }

    #[test]
    fn test_rerunning_on_output_keeps_columns_stable() {
        let config = Configuration::default();
        let first = estimate_to_string(LOG, &config);
        let second = estimate_to_string(&first, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_enabled_times_file_has_one_extra_column() {
        let config = Configuration::default();
        let table = read_event_log_from(LOG.as_bytes(), &config).unwrap();
        let oracle = ste_core::ConcurrencyOracle::from_log(table.log(), &config);
        let enabled = oracle.enabled_times(table.log(), false);

        let mut output = Vec::new();
        write_enabled_times_to(&mut output, table.columns(), table.log(), &enabled, &config)
            .unwrap();
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "case_id,Activity,Resource,end_time,cost,enabled_time");
        assert_eq!(
            lines[2],
            "c1,B,bob,2025-01-15T09:30:00.000+00:00,7,2025-01-15T09:00:00.000+00:00"
        );
        assert!(lines[1].ends_with(",5,"));
    }

    #[test]
    fn test_gzip_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("log.csv");
        let output = dir.path().join("estimated.csv.gz");
        std::fs::write(&input, LOG).unwrap();

        let config = Configuration::default();
        let table = read_event_log(&input, &config).unwrap();
        let estimator = StartTimeEstimator::new(table.log(), &config).unwrap();
        write_estimated_log(&output, &table, &estimator.estimate(), &config).unwrap();

        let written = read_event_log(&output, &config).unwrap();
        assert_eq!(written.log().len(), 3);
        assert!(written.columns().contains(&"estimated_start_time".to_string()));
        assert_eq!(written.log().events()[1].attribute("cost"), Some("7"));
    }
}

