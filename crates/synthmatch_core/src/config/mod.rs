//! Configuration management.
//!
//! - TOML configuration with `[logging]`, `[matching]` and `[picking]` sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates
//! - Validation on load
//!
//! # Example
//!
//! ```no_run
//! use synthmatch_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/synthmatch.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Workers: {}", config.settings().matching.workers);
//!
//! config.settings_mut().picking.use_envelope = true;
//! config.update_section(ConfigSection::Picking).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, LoggingSettings, MatchingSettings, PickingSettings, Settings};
