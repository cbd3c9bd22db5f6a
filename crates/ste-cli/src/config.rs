//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ste_core::Configuration;

/// Application configuration.
///
/// ```toml
/// [estimation]
/// concurrency_oracle = "heuristics"
/// re_estimation_method = "median"
/// bot_resources = ["system"]
///
/// [estimation.log_ids]
/// case = "case_id"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parameters of the start time estimation.
    pub estimation: Configuration,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `STE_` environment variables (`STE_ESTIMATION__CONCURRENCY_ORACLE=alpha`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (STE_*)
        figment = figment.merge(Env::prefixed("STE_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ste.
///
/// On Linux: `~/.config/ste`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ste"))
}
