//! synthmatch core - multi-channel waveform template matching and
//! cross-correlation picking.
//!
//! - [`matching`] finds which of a list of templates best explains a
//!   recording, by normalized cross-correlation summed over channels.
//! - [`picking`] aligns every channel of a recording against a master
//!   channel and places one pick per channel.
//!
//! The crate has no I/O surface besides its config file; waveform reading
//! and plotting live outside it.

pub mod config;
pub mod diagnostics;
mod fft;
pub mod logging;
pub mod matching;
pub mod models;
pub mod picking;
pub mod pool;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
