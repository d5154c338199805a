//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be updated independently.

use serde::{Deserialize, Serialize};

use crate::diagnostics::MAX_VERBOSITY;
use crate::logging::LogLevel;
use crate::models::ChannelKey;
use crate::picking::DEFAULT_MAX_SHIFT_FRACTION;
use crate::pool::DEFAULT_WORKERS;

use super::manager::{ConfigError, ConfigResult};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Template matching settings.
    #[serde(default)]
    pub matching: MatchingSettings,

    /// Alignment picking settings.
    #[serde(default)]
    pub picking: PickingSettings,
}

impl Settings {
    /// Check every section for out-of-range values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.matching.workers == 0 {
            return Err(ConfigError::invalid("matching.workers", "must be at least 1"));
        }
        if self.matching.debug > MAX_VERBOSITY {
            return Err(ConfigError::invalid(
                "matching.debug",
                format!("must be at most {}", MAX_VERBOSITY),
            ));
        }
        if self.picking.debug > MAX_VERBOSITY {
            return Err(ConfigError::invalid(
                "picking.debug",
                format!("must be at most {}", MAX_VERBOSITY),
            ));
        }

        let fraction = self.picking.max_shift_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::invalid(
                "picking.max_shift_fraction",
                format!("must be in (0, 1), got {}", fraction),
            ));
        }

        if let Some(master) = self.picking.master.as_deref() {
            if !master.trim().is_empty() {
                master
                    .trim()
                    .parse::<ChannelKey>()
                    .map_err(|e| ConfigError::invalid("picking.master", e.to_string()))?;
            }
        }

        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level, overridden by `RUST_LOG`.
    #[serde(default)]
    pub level: LogLevel,

    /// Directory for a log file. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

/// Template matching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Worker threads for channel correlation.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Diagnostic verbosity (0-5).
    #[serde(default)]
    pub debug: u8,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            debug: 0,
        }
    }
}

/// Alignment picking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingSettings {
    /// Master channel as `STATION.CHANNEL`. First channel when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,

    /// Correlate envelopes instead of raw waveforms.
    #[serde(default)]
    pub use_envelope: bool,

    /// Half-width of the lag window as a fraction of channel length.
    #[serde(default = "default_max_shift_fraction")]
    pub max_shift_fraction: f64,

    /// Diagnostic verbosity (0-5).
    #[serde(default)]
    pub debug: u8,
}

fn default_max_shift_fraction() -> f64 {
    DEFAULT_MAX_SHIFT_FRACTION
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self {
            master: None,
            use_envelope: false,
            max_shift_fraction: default_max_shift_fraction(),
            debug: 0,
        }
    }
}

/// Config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Logging,
    Matching,
    Picking,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 3] = [
        ConfigSection::Logging,
        ConfigSection::Matching,
        ConfigSection::Picking,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Logging => "logging",
            ConfigSection::Matching => "matching",
            ConfigSection::Picking => "picking",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Matching => "Template matching",
            ConfigSection::Picking => "Alignment picking",
        }
    }
}
