//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ste_core::{
    ConcurrencyOracleType, Configuration, EventLogIds, ReEstimationMethod, Statistic,
};

/// Start time estimator for process event logs.
///
/// Estimates when each activity instance started from the moment it was
/// enabled by its causal predecessors and the moment its resource became
/// available.
#[derive(Debug, Parser)]
#[command(name = "ste", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Estimate the start times of an event log.
    Estimate {
        /// Input log (.csv, .csv.gz, .xes or .xes.gz).
        input: PathBuf,

        /// Output log (.csv, .csv.gz, .xes or .xes.gz).
        output: PathBuf,

        #[command(flatten)]
        args: EstimateArgs,
    },

    /// Print the concurrency relation mined from an event log.
    Concurrency {
        /// Input log (.csv, .csv.gz, .xes or .xes.gz).
        input: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        mining: MiningArgs,
    },

    /// Write the enabled time of every event of a log.
    Enabled {
        /// Input log (.csv, .csv.gz, .xes or .xes.gz).
        input: PathBuf,

        /// Output log (.csv, .csv.gz, .xes or .xes.gz).
        output: PathBuf,

        /// Use the start of the trace when no predecessor enables an event.
        #[arg(long)]
        unknown_as_trace_start: bool,

        #[command(flatten)]
        mining: MiningArgs,
    },
}

/// Field name conventions of the input log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldNames {
    Csv,
    Xes,
}

/// Options shared by every command that mines a log.
#[derive(Debug, Default, Args)]
pub struct MiningArgs {
    /// Concurrency oracle (deactivated, none, alpha, heuristics).
    #[arg(long, value_name = "ORACLE")]
    pub oracle: Option<ConcurrencyOracleType>,

    /// Field name convention of the log.
    #[arg(long, value_enum)]
    pub field_names: Option<FieldNames>,

    /// Skip predecessors overlapping the recorded start of an event.
    #[arg(long)]
    pub consider_start_times: bool,
}

impl MiningArgs {
    /// Overrides the loaded configuration with the flags that were given.
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(oracle) = self.oracle {
            config.concurrency_oracle = oracle;
        }
        if let Some(field_names) = self.field_names {
            let estimate_source = config.log_ids.estimate_source.take();
            config.log_ids = match field_names {
                FieldNames::Csv => EventLogIds::csv(),
                FieldNames::Xes => EventLogIds::xes(),
            };
            config.log_ids.estimate_source = estimate_source;
        }
        if self.consider_start_times {
            config.consider_start_times = true;
        }
    }
}

/// Options of the `estimate` command.
#[derive(Debug, Default, Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub mining: MiningArgs,

    /// Resolution of events with no enablement nor availability
    /// (set_instant, mode, median, mean).
    #[arg(long, value_name = "METHOD")]
    pub re_estimation: Option<ReEstimationMethod>,

    /// Resource that is always available (repeatable).
    #[arg(long = "bot", value_name = "RESOURCE")]
    pub bot_resources: Vec<String>,

    /// Activity with zero duration (repeatable).
    #[arg(long = "instant", value_name = "ACTIVITY")]
    pub instant_activities: Vec<String>,

    /// Value of the resource field meaning "unknown".
    #[arg(long, value_name = "VALUE")]
    pub missing_resource: Option<String>,

    /// Keep recorded start times instead of estimating them.
    #[arg(long)]
    pub reuse_start_times: bool,

    /// Write estimates into the start time column.
    #[arg(long)]
    pub replace_start_times: bool,

    /// Clip durations over THRESHOLD times the typical duration of their activity.
    #[arg(long, value_name = "THRESHOLD")]
    pub outlier_threshold: Option<f64>,

    /// Typical duration used for outliers (mode, median, mean).
    #[arg(long, value_name = "STATISTIC")]
    pub outlier_statistic: Option<Statistic>,

    /// Add a column naming the rule behind each estimate.
    #[arg(long, value_name = "COLUMN", num_args = 0..=1, default_missing_value = "estimate_source")]
    pub source_column: Option<String>,
}

impl EstimateArgs {
    /// Overrides the loaded configuration with the flags that were given.
    pub fn apply(&self, config: &mut Configuration) {
        self.mining.apply(config);
        if let Some(method) = self.re_estimation {
            config.re_estimation_method = method;
        }
        config
            .bot_resources
            .extend(self.bot_resources.iter().cloned());
        config
            .instant_activities
            .extend(self.instant_activities.iter().cloned());
        if let Some(missing) = &self.missing_resource {
            config.missing_resource.clone_from(missing);
        }
        if self.reuse_start_times {
            config.reuse_current_start_times = true;
        }
        if self.replace_start_times {
            config.replace_recorded_start_times = true;
        }
        if let Some(threshold) = self.outlier_threshold {
            config.outlier_threshold = Some(threshold);
        }
        if let Some(statistic) = self.outlier_statistic {
            config.outlier_statistic = statistic;
        }
        if let Some(column) = &self.source_column {
            config.log_ids.estimate_source = Some(column.clone());
        }
    }
}
