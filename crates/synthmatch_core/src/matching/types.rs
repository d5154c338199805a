//! Core types for template matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ChannelKey;
use crate::pool::PoolError;

/// Value reported at an offset where no correlation could be computed.
pub const NO_CORRELATION: f64 = 0.0;

/// Score given to a template with nothing to correlate.
pub const MIN_SCORE: f64 = f64::NEG_INFINITY;

/// Why a channel produced no usable correlation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadReason {
    /// Template channel is entirely invalid samples.
    Placeholder,
    /// Template channel contains some invalid samples.
    InvalidTemplateSamples,
    /// Template channel has zero variance.
    FlatTemplate,
    /// Every recording window overlaps invalid samples.
    AllWindowsInvalid,
    /// Every recording window is invalid or has zero variance.
    NoUsableWindows,
}

impl fmt::Display for DeadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadReason::Placeholder => write!(f, "placeholder"),
            DeadReason::InvalidTemplateSamples => write!(f, "invalid template samples"),
            DeadReason::FlatTemplate => write!(f, "flat template"),
            DeadReason::AllWindowsInvalid => write!(f, "all windows invalid"),
            DeadReason::NoUsableWindows => write!(f, "no usable windows"),
        }
    }
}

/// Quality of one channel's correlation series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Every offset carries a real coefficient.
    Live,
    /// Some offsets were set to [`NO_CORRELATION`] because the recording
    /// window held invalid samples or had zero variance.
    Partial {
        invalid_offsets: usize,
        flat_offsets: usize,
    },
    /// No offset carries a real coefficient.
    Dead { reason: DeadReason },
}

impl ChannelStatus {
    pub fn is_dead(&self) -> bool {
        matches!(self, ChannelStatus::Dead { .. })
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Live => write!(f, "live"),
            ChannelStatus::Partial {
                invalid_offsets,
                flat_offsets,
            } => write!(
                f,
                "partial ({} invalid, {} flat offsets)",
                invalid_offsets, flat_offsets
            ),
            ChannelStatus::Dead { reason } => write!(f, "dead ({})", reason),
        }
    }
}

/// Correlation series of one template channel slid across the recording.
///
/// `series[k]` is the normalized coefficient with template sample 0 aligned
/// to recording sample `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCorrelation {
    pub key: ChannelKey,
    pub series: Vec<f64>,
    pub status: ChannelStatus,
}

impl ChannelCorrelation {
    /// A series that carries no correlation at any offset.
    pub fn dead(key: ChannelKey, offsets: usize, reason: DeadReason) -> Self {
        Self {
            key,
            series: vec![NO_CORRELATION; offsets],
            status: ChannelStatus::Dead { reason },
        }
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_dead()
    }

    /// Highest coefficient, or `None` for a dead channel.
    pub fn peak(&self) -> Option<f64> {
        if self.status.is_dead() {
            return None;
        }
        self.series.iter().copied().reduce(f64::max)
    }
}

/// Aggregated score of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateScore {
    /// Maximum of the summed series, or [`MIN_SCORE`].
    pub score: f64,
    /// Offset of the first maximum.
    pub peak_offset: Option<usize>,
    /// Channels that contributed real coefficients.
    pub live_channels: usize,
    /// Element-wise sum of the channel series.
    pub aggregate: Vec<f64>,
}

impl TemplateScore {
    /// Score for a template with nothing to contribute.
    pub fn minimum() -> Self {
        Self {
            score: MIN_SCORE,
            peak_offset: None,
            live_channels: 0,
            aggregate: Vec::new(),
        }
    }
}

/// Matching result for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    /// Position of the template in the caller's list.
    pub index: usize,
    pub score: TemplateScore,
    /// Per-channel series in reconciled channel order.
    pub channels: Vec<ChannelCorrelation>,
    /// Why the template could not be correlated, if it could not.
    pub failure: Option<String>,
}

/// Summary of what channel reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Channel keys shared by the recording and every template, in order.
    pub required: Vec<ChannelKey>,
    /// Recording channels no template uses.
    pub dropped_from_recording: Vec<ChannelKey>,
    /// Template channels the recording cannot provide.
    pub removed_from_templates: Vec<ChannelKey>,
    /// Placeholder channels added, by template index.
    pub placeholders: Vec<(usize, ChannelKey)>,
}

/// Full result of matching a recording against a template list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub best_index: usize,
    pub best_score: f64,
    pub templates: Vec<TemplateMatch>,
    pub reconciliation: ReconcileSummary,
}

impl MatchOutcome {
    /// Scores in template order.
    pub fn scores(&self) -> Vec<f64> {
        self.templates.iter().map(|t| t.score.score).collect()
    }

    /// The winning template's result.
    pub fn best(&self) -> &TemplateMatch {
        &self.templates[self.best_index]
    }

    /// Serialize for external plotting tools.
    ///
    /// Non-finite scores are written as `null`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Error types for matching operations.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// No templates were supplied.
    #[error("Template list is empty")]
    EmptyTemplateList,

    /// Recording and templates share no channels.
    #[error("Recording and templates have no channels in common")]
    NoCommonChannels,

    /// A template channel cannot be slid across the recording channel.
    #[error(
        "Channel {key}: template ({template_len} samples) does not fit in recording ({recording_len} samples)"
    )]
    ChannelLengthMismatch {
        key: ChannelKey,
        template_len: usize,
        recording_len: usize,
    },

    /// Template and recording channel were sampled differently.
    #[error("Channel {key}: sample rate mismatch ({template_rate} Hz vs {recording_rate} Hz)")]
    SampleRateMismatch {
        key: ChannelKey,
        template_rate: f64,
        recording_rate: f64,
    },

    /// A template channel has no counterpart in the recording.
    #[error("Channel {0} missing from recording")]
    MissingChannel(ChannelKey),

    /// No scores to select from.
    #[error("Score list is empty")]
    EmptyScoreList,

    /// Worker pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Type alias for matching results.
pub type MatchResult<T> = Result<T, MatchError>;
