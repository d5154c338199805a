//! Data models for waveform matching and picking.
//!
//! - Channel keys and single-channel traces
//! - Multi-channel streams (recordings and templates)
//! - Picks

mod pick;
mod stream;
mod trace;

use thiserror::Error;

pub use pick::{Impulsivity, Phase, Pick, PickWeight};
pub use stream::{Recording, Stream, Template};
pub use trace::{
    is_valid_sample, seconds_to_duration, zero_fill, ChannelKey, ChannelTrace, KeyParseError,
};

/// Errors raised while building streams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Two traces in one stream share a key.
    #[error("Duplicate channel {0} in stream")]
    DuplicateChannel(ChannelKey),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
