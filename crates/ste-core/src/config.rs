//! Estimation configuration.
//!
//! Every knob of the estimator lives in [`Configuration`], an immutable value
//! object that is deserializable from TOML/env layers and validated once when
//! the estimator is built.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, raised when an estimator is constructed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A selector string did not name any known variant.
    #[error("unknown {kind}: {value} (expected one of: {expected})")]
    UnknownSelector {
        kind: &'static str,
        value: String,
        expected: String,
    },

    /// The resource availability variant is recognized but not implemented.
    #[error("resource availability '{0}' is not supported")]
    UnsupportedResourceAvailability(ResourceAvailabilityType),

    /// A heuristics threshold fell outside `[0, 1]`.
    #[error("heuristics threshold '{name}' must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    /// The outlier threshold is not a positive finite number.
    #[error("outlier threshold must be a positive number, got {value}")]
    InvalidOutlierThreshold { value: f64 },
}

/// Generates a closed selector enum with its canonical string names.
///
/// The string form is used for `Display`, `FromStr` and serde, so config files,
/// environment variables and CLI flags all accept the same spelling.
macro_rules! define_selector {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $text:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical configuration name of the variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(ConfigError::UnknownSelector {
                        kind: $kind,
                        value: s.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_selector! {
    /// Which concurrency oracle decides the enablement of an activity instance.
    ConcurrencyOracleType, "concurrency oracle" {
        /// No causal signal at all; enablement is always unknown.
        Deactivated => "deactivated",
        /// Every directly-follows relation is causal.
        None => "none" | "directly_follows",
        /// Concurrent when both orders are observed.
        Alpha => "alpha",
        /// Concurrent when both orders are observed and the dependency is weak.
        Heuristics => "heuristics",
    }
}

define_selector! {
    /// How the availability of a resource is derived.
    ResourceAvailabilityType, "resource availability" {
        /// From the end timestamps of everything the resource performed.
        Simple => "simple",
        /// Working calendars and non-working days. Reserved.
        WithCalendar => "with_calendar",
    }
}

define_selector! {
    /// How events with no causal nor resource signal get their start time.
    ReEstimationMethod, "re-estimation method" {
        /// Zero duration: the start is the end.
        SetInstant => "set_instant" | "instant",
        /// Most frequent observed duration of the activity.
        Mode => "mode",
        /// Median observed duration of the activity.
        Median => "median",
        /// Mean observed duration of the activity.
        Mean => "mean",
    }
}

define_selector! {
    /// Central tendency statistic over a distribution of durations.
    Statistic, "statistic" {
        Mode => "mode",
        Median => "median",
        Mean => "mean",
    }
}

impl Default for ConcurrencyOracleType {
    fn default() -> Self {
        Self::Heuristics
    }
}

impl Default for ResourceAvailabilityType {
    fn default() -> Self {
        Self::Simple
    }
}

impl Default for ReEstimationMethod {
    fn default() -> Self {
        Self::Median
    }
}

impl Default for Statistic {
    fn default() -> Self {
        Self::Median
    }
}

impl ReEstimationMethod {
    /// The statistic backing this method, or `None` for [`Self::SetInstant`].
    pub const fn statistic(self) -> Option<Statistic> {
        match self {
            Self::SetInstant => None,
            Self::Mode => Some(Statistic::Mode),
            Self::Median => Some(Statistic::Median),
            Self::Mean => Some(Statistic::Mean),
        }
    }
}

/// Names of the fields of an event log, so the engine stays schema agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogIds {
    pub case: String,
    pub activity: String,
    pub resource: String,
    pub start_time: String,
    pub end_time: String,
    pub enabled_time: String,
    pub available_time: String,
    pub estimated_start_time: String,
    pub lifecycle: String,
    /// Column for the audit tag of each estimate. Not written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_source: Option<String>,
}

impl EventLogIds {
    /// Field names used by tabular (CSV) logs.
    pub fn csv() -> Self {
        Self {
            case: "case_id".into(),
            activity: "Activity".into(),
            resource: "Resource".into(),
            start_time: "start_time".into(),
            end_time: "end_time".into(),
            enabled_time: "enabled_time".into(),
            available_time: "available_time".into(),
            estimated_start_time: "estimated_start_time".into(),
            lifecycle: "Lifecycle".into(),
            estimate_source: None,
        }
    }

    /// Field names following the XES standard extensions.
    pub fn xes() -> Self {
        Self {
            case: "case:concept:name".into(),
            activity: "concept:name".into(),
            resource: "org:resource".into(),
            start_time: "time:start".into(),
            end_time: "time:timestamp".into(),
            enabled_time: "time:enabled".into(),
            available_time: "time:available".into(),
            estimated_start_time: "time:estimated_start".into(),
            lifecycle: "lifecycle:transition".into(),
            estimate_source: None,
        }
    }

    /// Names the engine derives or interprets; everything else is passthrough.
    pub fn reserved(&self) -> [&str; 8] {
        [
            &self.case,
            &self.activity,
            &self.resource,
            &self.start_time,
            &self.end_time,
            &self.enabled_time,
            &self.available_time,
            &self.estimated_start_time,
        ]
    }
}

impl Default for EventLogIds {
    fn default() -> Self {
        Self::csv()
    }
}

/// Thresholds of the heuristics concurrency oracle, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsThresholds {
    /// Directly-follows dependency above which a relation is causal.
    pub df: f64,
    /// Length-2-loop dependency above which two activities form a loop.
    pub l2l: f64,
    /// Length-1-loop strength above which the length-2-loop measure is ignored.
    pub l1l: f64,
}

impl Default for HeuristicsThresholds {
    fn default() -> Self {
        Self {
            df: 0.9,
            l2l: 0.9,
            l1l: 0.9,
        }
    }
}

impl HeuristicsThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("df", self.df), ("l2l", self.l2l), ("l1l", self.l1l)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Parameters of the start time estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Field names of the event log.
    pub log_ids: EventLogIds,

    /// Concurrency oracle used to compute enablement.
    pub concurrency_oracle: ConcurrencyOracleType,

    /// Engine used to compute resource availability.
    pub resource_availability: ResourceAvailabilityType,

    /// Resource value marking events whose resource is unknown. Those events
    /// are not constrained by resource availability.
    pub missing_resource: String,

    /// How to resolve events with neither enablement nor availability.
    pub re_estimation_method: ReEstimationMethod,

    /// Resources that are always instantly available (e.g. automated systems).
    pub bot_resources: BTreeSet<String>,

    /// Activities with zero duration.
    pub instant_activities: BTreeSet<String>,

    /// Thresholds for [`ConcurrencyOracleType::Heuristics`].
    pub heuristics_thresholds: HeuristicsThresholds,

    /// Keep already recorded start times instead of estimating them.
    /// Instant activities are still set as instant.
    pub reuse_current_start_times: bool,

    /// Write the estimate into the start time field instead of its own field.
    pub replace_recorded_start_times: bool,

    /// Ignore predecessors (and resource work) ending after the recorded
    /// start of the current event, as they overlap it.
    pub consider_start_times: bool,

    /// Statistic of the duration distribution used to detect outliers.
    pub outlier_statistic: Statistic,

    /// Durations over `outlier_threshold × statistic` are clipped to that
    /// limit. Disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_threshold: Option<f64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_ids: EventLogIds::default(),
            concurrency_oracle: ConcurrencyOracleType::default(),
            resource_availability: ResourceAvailabilityType::default(),
            missing_resource: "NOT_SET".to_string(),
            re_estimation_method: ReEstimationMethod::default(),
            bot_resources: BTreeSet::new(),
            instant_activities: BTreeSet::new(),
            heuristics_thresholds: HeuristicsThresholds::default(),
            reuse_current_start_times: false,
            replace_recorded_start_times: false,
            consider_start_times: false,
            outlier_statistic: Statistic::default(),
            outlier_threshold: None,
        }
    }
}

impl Configuration {
    /// Checks value ranges that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heuristics_thresholds.validate()?;
        if let Some(value) = self.outlier_threshold {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidOutlierThreshold { value });
            }
        }
        Ok(())
    }

    /// Whether `resource` is configured as a bot.
    pub fn is_bot(&self, resource: &str) -> bool {
        self.bot_resources.contains(resource)
    }

    /// Whether `activity` is configured as instant.
    pub fn is_instant(&self, activity: &str) -> bool {
        self.instant_activities.contains(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_parse_their_display_form() {
        for oracle in ConcurrencyOracleType::ALL {
            assert_eq!(oracle.to_string().parse::<ConcurrencyOracleType>(), Ok(*oracle));
        }
        for method in ReEstimationMethod::ALL {
            assert_eq!(method.to_string().parse::<ReEstimationMethod>(), Ok(*method));
        }
    }

    #[test]
    fn test_selector_aliases_and_case_are_accepted() {
        assert_eq!(
            "Directly_Follows".parse::<ConcurrencyOracleType>(),
            Ok(ConcurrencyOracleType::None)
        );
        assert_eq!(
            " instant ".parse::<ReEstimationMethod>(),
            Ok(ReEstimationMethod::SetInstant)
        );
    }

    #[test]
    fn test_unknown_selector_lists_expected_values() {
        let err = "inductive".parse::<ConcurrencyOracleType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown concurrency oracle: inductive (expected one of: deactivated, none, alpha, heuristics)"
        );
    }

    #[test]
    fn test_unknown_selector_fails_deserialization() {
        let result: Result<ResourceAvailabilityType, _> = serde_json::from_str(r#""daily""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Configuration::default();
        assert_eq!(config.concurrency_oracle, ConcurrencyOracleType::Heuristics);
        assert_eq!(config.resource_availability, ResourceAvailabilityType::Simple);
        assert_eq!(config.re_estimation_method, ReEstimationMethod::Median);
        assert_eq!(config.missing_resource, "NOT_SET");
        assert_eq!(config.heuristics_thresholds, HeuristicsThresholds::default());
        assert!(config.outlier_threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let config = Configuration {
            heuristics_thresholds: HeuristicsThresholds {
                l2l: 1.5,
                ..HeuristicsThresholds::default()
            },
            ..Configuration::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange {
                name: "l2l",
                value: 1.5
            })
        );
    }

    #[test]
    fn test_non_positive_outlier_threshold_is_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = Configuration {
                outlier_threshold: Some(value),
                ..Configuration::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidOutlierThreshold { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{
            "concurrency_oracle": "alpha",
            "bot_resources": ["System"],
            "log_ids": { "activity": "Task" },
            "outlier_threshold": 2.0
        }"#;
        let config: Configuration = serde_json::from_str(json).unwrap();
        assert_eq!(config.concurrency_oracle, ConcurrencyOracleType::Alpha);
        assert!(config.is_bot("System"));
        assert_eq!(config.log_ids.activity, "Task");
        assert_eq!(config.log_ids.case, "case_id");
        assert_eq!(config.outlier_threshold, Some(2.0));
    }

    #[test]
    fn test_re_estimation_method_maps_to_statistic() {
        assert_eq!(ReEstimationMethod::SetInstant.statistic(), None);
        assert_eq!(ReEstimationMethod::Mode.statistic(), Some(Statistic::Mode));
        assert_eq!(ReEstimationMethod::Mean.statistic(), Some(Statistic::Mean));
    }
}
