//! Channel keys and single-channel waveform traces.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one waveform channel: a (station, channel-code) pair.
///
/// Displays and parses as `STATION.CHANNEL`, e.g. `STA1.Z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub station: String,
    pub channel: String,
}

impl ChannelKey {
    pub fn new(station: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.station, self.channel)
    }
}

/// Error returned when a `STATION.CHANNEL` string cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid channel key '{0}': expected STATION.CHANNEL")]
pub struct KeyParseError(pub String);

impl FromStr for ChannelKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Station codes never contain a dot; channel codes might (location.channel)
        let (station, channel) = s
            .split_once('.')
            .ok_or_else(|| KeyParseError(s.to_string()))?;

        if station.trim().is_empty() || channel.trim().is_empty() {
            return Err(KeyParseError(s.to_string()));
        }

        Ok(Self::new(station.trim(), channel.trim()))
    }
}

/// Returns true if a sample carries usable data.
///
/// `NaN` and infinities are invalid samples.
#[inline]
pub fn is_valid_sample(value: f64) -> bool {
    value.is_finite()
}

/// One time series for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTrace {
    /// Station and channel code.
    pub key: ChannelKey,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Time of the first sample.
    pub start_time: DateTime<Utc>,
    /// Sample values; non-finite values are invalid samples.
    pub samples: Vec<f64>,
}

impl ChannelTrace {
    /// Create a new trace.
    pub fn new(
        key: ChannelKey,
        sample_rate: f64,
        start_time: DateTime<Utc>,
        samples: Vec<f64>,
    ) -> Self {
        Self {
            key,
            sample_rate,
            start_time,
            samples,
        }
    }

    /// Create a placeholder trace made entirely of invalid (`NaN`) samples.
    pub fn placeholder(
        key: ChannelKey,
        sample_rate: f64,
        start_time: DateTime<Utc>,
        len: usize,
    ) -> Self {
        Self::new(key, sample_rate, start_time, vec![f64::NAN; len])
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the trace holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check if every sample is invalid.
    ///
    /// Empty traces are not placeholders.
    pub fn is_placeholder(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(|&s| !is_valid_sample(s))
    }

    /// Number of invalid samples.
    pub fn invalid_count(&self) -> usize {
        self.samples.iter().filter(|&&s| !is_valid_sample(s)).count()
    }

    /// Duration covered by the samples, in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate
    }

    /// Absolute time of a (possibly fractional or negative) sample offset.
    pub fn time_at(&self, sample_offset: f64) -> DateTime<Utc> {
        self.start_time + seconds_to_duration(sample_offset / self.sample_rate)
    }

    /// Absolute time of the last sample.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.time_at(self.samples.len().saturating_sub(1) as f64)
    }
}

/// Replace invalid samples with zero.
pub fn zero_fill(samples: &[f64]) -> Vec<f64> {
    samples
        .iter()
        .map(|&s| if is_valid_sample(s) { s } else { 0.0 })
        .collect()
}

/// Convert fractional seconds to a chrono duration at nanosecond precision.
pub fn seconds_to_duration(secs: f64) -> Duration {
    Duration::nanoseconds((secs * 1e9).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn key_round_trips_through_display() {
        let key = ChannelKey::new("STA1", "Z");
        assert_eq!(key.to_string(), "STA1.Z");
        assert_eq!("STA1.Z".parse::<ChannelKey>().unwrap(), key);
    }

    #[test]
    fn key_parse_keeps_dotted_channel_part() {
        let key: ChannelKey = "WVZ.10.HHZ".parse().unwrap();
        assert_eq!(key.station, "WVZ");
        assert_eq!(key.channel, "10.HHZ");
    }

    #[test]
    fn key_parse_rejects_bad_input() {
        assert!("STA1".parse::<ChannelKey>().is_err());
        assert!(".Z".parse::<ChannelKey>().is_err());
        assert!("STA1.".parse::<ChannelKey>().is_err());
    }

    #[test]
    fn placeholder_is_all_invalid() {
        let trace = ChannelTrace::placeholder(ChannelKey::new("A", "Z"), 100.0, start(), 10);
        assert_eq!(trace.len(), 10);
        assert!(trace.is_placeholder());
        assert_eq!(trace.invalid_count(), 10);
    }

    #[test]
    fn empty_trace_is_not_placeholder() {
        let trace = ChannelTrace::placeholder(ChannelKey::new("A", "Z"), 100.0, start(), 0);
        assert!(!trace.is_placeholder());
    }

    #[test]
    fn time_at_uses_sample_rate() {
        let trace = ChannelTrace::new(ChannelKey::new("A", "Z"), 100.0, start(), vec![0.0; 1000]);
        assert_eq!(trace.time_at(50.0), start() + Duration::milliseconds(500));
        assert_eq!(trace.time_at(-100.0), start() - Duration::seconds(1));
        assert_eq!(trace.end_time(), start() + Duration::milliseconds(9990));
        assert!((trace.duration_secs() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn zero_fill_replaces_non_finite() {
        let filled = zero_fill(&[1.0, f64::NAN, f64::INFINITY, -2.0]);
        assert_eq!(filled, vec![1.0, 0.0, 0.0, -2.0]);
    }
}
