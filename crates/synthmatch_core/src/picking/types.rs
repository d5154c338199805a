//! Types for alignment picking.

use serde::{Deserialize, Serialize};

use crate::config::PickingSettings;
use crate::models::{ChannelKey, ChannelTrace, KeyParseError, Pick};

/// Default half-width of the lag window, as a fraction of channel length.
pub const DEFAULT_MAX_SHIFT_FRACTION: f64 = 0.3;

/// Which channel the others are aligned against.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MasterChannel {
    /// First channel of the recording.
    #[default]
    First,
    /// Channel of the recording with this key.
    Key(ChannelKey),
    /// A trace supplied by the caller.
    Trace(ChannelTrace),
}

/// Configuration for the alignment picker.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerConfig {
    pub master: MasterChannel,
    /// Correlate analytic envelopes instead of raw waveforms.
    pub use_envelope: bool,
    /// Half-width of the lag window as a fraction of the candidate length,
    /// in (0, 1).
    pub max_shift_fraction: f64,
    /// Diagnostic verbosity (0 = silent).
    pub debug: u8,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            master: MasterChannel::First,
            use_envelope: false,
            max_shift_fraction: DEFAULT_MAX_SHIFT_FRACTION,
            debug: 0,
        }
    }
}

impl PickerConfig {
    /// Set the master channel.
    pub fn with_master(mut self, master: MasterChannel) -> Self {
        self.master = master;
        self
    }

    /// Set whether envelopes are correlated.
    pub fn with_envelope(mut self, use_envelope: bool) -> Self {
        self.use_envelope = use_envelope;
        self
    }

    /// Set the lag window fraction.
    pub fn with_max_shift_fraction(mut self, fraction: f64) -> Self {
        self.max_shift_fraction = fraction;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> PickResult<()> {
        let f = self.max_shift_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(PickError::InvalidShiftFraction(f));
        }
        Ok(())
    }
}

impl TryFrom<&PickingSettings> for PickerConfig {
    type Error = PickError;

    fn try_from(settings: &PickingSettings) -> Result<Self, Self::Error> {
        let master = match settings.master.as_deref().map(str::trim) {
            None | Some("") => MasterChannel::First,
            Some(key) => MasterChannel::Key(key.parse()?),
        };

        let config = Self {
            master,
            use_envelope: settings.use_envelope,
            max_shift_fraction: settings.max_shift_fraction,
            debug: settings.debug,
        };
        config.validate()?;
        Ok(config)
    }
}

/// A pick together with the alignment that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPick {
    pub pick: Pick,
    /// Lag of the candidate behind the master, in samples.
    pub lag_samples: i64,
    /// Normalized correlation coefficient at that lag.
    pub coefficient: f64,
}

/// Error types for picking operations.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    /// The recording has no channels.
    #[error("Recording has no channels")]
    EmptyRecording,

    /// The requested master channel is not in the recording.
    #[error("Master channel {0} not found in recording")]
    MasterNotFound(ChannelKey),

    /// Lag window fraction outside (0, 1).
    #[error("Max shift fraction must be in (0, 1), got {0}")]
    InvalidShiftFraction(f64),

    /// Master key in settings could not be parsed.
    #[error(transparent)]
    InvalidMasterKey(#[from] KeyParseError),
}

/// Type alias for picking results.
pub type PickResult<T> = Result<T, PickError>;
