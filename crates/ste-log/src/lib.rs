//! Event log files.
//!
//! Reads CSV and XES logs (plain or gzip-compressed) into an
//! [`ste_core::EventLog`] and writes them back enriched with the estimated
//! timestamps. Fields the estimator does not interpret are carried through
//! untouched.

mod reader;
mod timestamp;
mod writer;
mod xes;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use reader::{TabularLog, read_event_log, read_event_log_from};
pub use xes::read_xes_log_from;
pub use timestamp::{format_timestamp, parse_timestamp};
pub use writer::{
    write_enabled_times, write_enabled_times_to, write_estimated_log, write_estimated_log_to,
};

/// Event log file errors.
#[derive(Debug, Error)]
pub enum LogError {
    /// Failed to open or create a log file.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Malformed CSV or failure of the underlying stream.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// XES document that could not be parsed or written.
    #[error("xes error: {0}")]
    Xes(String),
    /// The file name does not end with `.csv`, `.csv.gz`, `.xes` or `.xes.gz`.
    #[error(
        "unsupported event log format: {} (expected .csv, .csv.gz, .xes or .xes.gz)",
        .0.display()
    )]
    UnsupportedExtension(PathBuf),
    /// A column the estimator needs is absent from the header.
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    /// An XES trace or event lacks a required attribute, or holds one that is
    /// not a timestamp where one is expected.
    #[error("missing or invalid '{attribute}' attribute in {location}")]
    InvalidAttribute { location: String, attribute: String },
    /// XES output is written over the source document, so it needs an XES
    /// input.
    #[error("cannot write {} as XES: the log was not read from an XES file", .0.display())]
    XesOutputWithoutXesInput(PathBuf),
    /// A timestamp cell could not be parsed.
    #[error("invalid timestamp on line {line}, column '{column}': {value:?}")]
    InvalidTimestamp {
        line: u64,
        column: String,
        value: String,
    },
}

impl LogError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Format and compression of a log file, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Csv,
    CsvGz,
    Xes,
    XesGz,
}

impl LogFormat {
    /// Detects the format from the file name, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, LogError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".csv.gz") {
            Ok(Self::CsvGz)
        } else if name.ends_with(".csv") {
            Ok(Self::Csv)
        } else if name.ends_with(".xes.gz") {
            Ok(Self::XesGz)
        } else if name.ends_with(".xes") {
            Ok(Self::Xes)
        } else {
            Err(LogError::UnsupportedExtension(path.to_path_buf()))
        }
    }

    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::CsvGz | Self::XesGz)
    }

    pub const fn is_xes(self) -> bool {
        matches!(self, Self::Xes | Self::XesGz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_the_file_name() {
        assert_eq!(LogFormat::from_path(Path::new("log.csv")).unwrap(), LogFormat::Csv);
        assert_eq!(
            LogFormat::from_path(Path::new("/tmp/Log.CSV.GZ")).unwrap(),
            LogFormat::CsvGz
        );
        assert_eq!(LogFormat::from_path(Path::new("log.xes")).unwrap(), LogFormat::Xes);
        assert_eq!(
            LogFormat::from_path(Path::new("Log.XES.gz")).unwrap(),
            LogFormat::XesGz
        );
        assert!(LogFormat::CsvGz.is_compressed());
        assert!(LogFormat::XesGz.is_compressed());
        assert!(!LogFormat::Csv.is_compressed());
        assert!(LogFormat::Xes.is_xes());
        assert!(!LogFormat::CsvGz.is_xes());
    }

    #[test]
    fn test_other_formats_are_rejected() {
        for name in ["log.json", "log.gz", "log.xes.zip", "log"] {
            let err = LogFormat::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, LogError::UnsupportedExtension(_)), "{name}");
            assert!(err.to_string().contains(name));
        }
    }
}
