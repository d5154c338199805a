//! Alignment picking: place one arrival-time pick per channel by aligning
//! every channel of a recording against a master channel.
//!
//! For each channel the picker:
//!
//! 1. zero-fills invalid samples,
//! 2. optionally replaces master and candidate with their envelopes,
//! 3. cross-correlates the candidate against the master over a lag window of
//!    `floor(max_shift_fraction * candidate_len)` samples either side,
//! 4. converts the peak lag to a time using the candidate's own sample rate.
//!
//! Unlike the matcher, invalid samples are neutralised rather than
//! propagated, since every channel must receive a definite lag.

mod envelope;
mod xcorr;
pub mod types;

pub use envelope::envelope;
pub use types::{
    AlignedPick, MasterChannel, PickError, PickResult, PickerConfig, DEFAULT_MAX_SHIFT_FRACTION,
};
pub use xcorr::{xcorr_lag, LagCorrelation};

use crate::config::PickingSettings;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::models::{zero_fill, ChannelTrace, Impulsivity, Phase, Pick, PickWeight, Recording};

/// Pick every channel of `recording` against the configured master.
///
/// Returns one pick per channel, in recording order.
///
/// # Errors
/// - [`PickError::InvalidShiftFraction`] for a fraction outside (0, 1).
/// - [`PickError::EmptyRecording`] if the recording has no channels.
/// - [`PickError::MasterNotFound`] if a keyed master is not in the recording.
pub fn pick(
    recording: &Recording,
    config: &PickerConfig,
    diagnostics: &Diagnostics,
) -> PickResult<Vec<Pick>> {
    Ok(pick_with_lags(recording, config, diagnostics)?
        .into_iter()
        .map(|aligned| aligned.pick)
        .collect())
}

/// Like [`pick`], but keeps the lag and coefficient behind each pick.
pub fn pick_with_lags(
    recording: &Recording,
    config: &PickerConfig,
    diagnostics: &Diagnostics,
) -> PickResult<Vec<AlignedPick>> {
    config.validate()?;

    if recording.is_empty() {
        return Err(PickError::EmptyRecording);
    }

    let (master, external) = resolve_master(recording, &config.master)?;

    tracing::info!(
        "Picking {} channel(s) against master {}{}",
        recording.len(),
        master.key,
        if external { " (external)" } else { "" }
    );

    diagnostics.emit(|| DiagnosticEvent::MasterSelected {
        key: master.key.clone(),
        external,
    });

    let master_samples = prepare(master, config.use_envelope);

    let picks = recording
        .iter()
        .map(|candidate| align_channel(&master_samples, candidate, config, diagnostics))
        .collect();

    Ok(picks)
}

fn resolve_master<'a>(
    recording: &'a Recording,
    master: &'a MasterChannel,
) -> PickResult<(&'a ChannelTrace, bool)> {
    match master {
        MasterChannel::First => recording
            .first()
            .map(|trace| (trace, false))
            .ok_or(PickError::EmptyRecording),
        MasterChannel::Key(key) => recording
            .get(key)
            .map(|trace| (trace, false))
            .ok_or_else(|| PickError::MasterNotFound(key.clone())),
        MasterChannel::Trace(trace) => Ok((trace, true)),
    }
}

/// Samples ready for correlation: zero-filled, then optionally enveloped.
///
/// Zeroing comes first so the envelope FFT only sees finite input.
fn prepare(trace: &ChannelTrace, use_envelope: bool) -> Vec<f64> {
    let samples = zero_fill(&trace.samples);
    if use_envelope {
        envelope(&samples)
    } else {
        samples
    }
}

fn align_channel(
    master: &[f64],
    candidate: &ChannelTrace,
    config: &PickerConfig,
    diagnostics: &Diagnostics,
) -> AlignedPick {
    let samples = prepare(candidate, config.use_envelope);
    let shift_len = (config.max_shift_fraction * samples.len() as f64).floor() as usize;

    diagnostics.emit(|| DiagnosticEvent::ShiftWindow {
        key: candidate.key.clone(),
        shift_len,
    });

    let correlation = xcorr_lag(master, &samples, shift_len);

    tracing::debug!(
        "{}: lag {} samples, coefficient {:.4}",
        candidate.key,
        correlation.lag,
        correlation.coefficient
    );
    tracing::trace!("{} coefficients: {:?}", candidate.key, correlation.coefficients);

    diagnostics.emit(|| DiagnosticEvent::PickCorrelation {
        key: candidate.key.clone(),
        lag_samples: correlation.lag,
        coefficient: correlation.coefficient,
        coefficients: diagnostics
            .enabled(4)
            .then(|| correlation.coefficients.clone()),
    });

    if correlation.coefficient <= 0.0 {
        tracing::warn!(
            "{}: no positive correlation with master, pick placed at lag {}",
            candidate.key,
            correlation.lag
        );
    }

    let time = candidate.time_at(correlation.lag as f64);
    let pick = Pick::new(candidate.key.clone(), time)
        .with_phase(Phase::S)
        .with_impulsivity(Impulsivity::Emergent)
        .with_weight(PickWeight::FULL);

    AlignedPick {
        pick,
        lag_samples: correlation.lag,
        coefficient: correlation.coefficient,
    }
}

/// Serialize picks to pretty JSON.
pub fn picks_to_json(picks: &[Pick]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(picks)
}

/// Alignment picker bound to a configuration and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Picker {
    config: PickerConfig,
    diagnostics: Diagnostics,
}

impl Picker {
    /// Create a picker, validating the configuration.
    pub fn new(config: PickerConfig) -> PickResult<Self> {
        config.validate()?;
        let diagnostics = Diagnostics::with_level(config.debug);
        Ok(Self {
            config,
            diagnostics,
        })
    }

    /// Create a picker from settings.
    pub fn from_settings(settings: &PickingSettings) -> PickResult<Self> {
        Self::new(PickerConfig::try_from(settings)?)
    }

    /// Replace the diagnostics handle.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Pick every channel of a recording.
    pub fn run(&self, recording: &Recording) -> PickResult<Vec<Pick>> {
        pick(recording, &self.config, &self.diagnostics)
    }

    /// Pick every channel, keeping lags and coefficients.
    pub fn run_with_lags(&self, recording: &Recording) -> PickResult<Vec<AlignedPick>> {
        pick_with_lags(recording, &self.config, &self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::models::{ChannelKey, Stream};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap()
    }

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    fn shifted(samples: &[f64], by: usize) -> Vec<f64> {
        let mut out = vec![0.0; by];
        out.extend_from_slice(&samples[..samples.len() - by]);
        out
    }

    fn trace(key: &str, samples: Vec<f64>) -> ChannelTrace {
        ChannelTrace::new(key.parse().unwrap(), 100.0, start(), samples)
    }

    fn shifted_recording() -> Stream {
        let base = noise(1000, 11);
        Stream::new(vec![
            trace("STA1.Z", base.clone()),
            trace("STA2.Z", shifted(&base, 50)),
        ])
        .unwrap()
    }

    #[test]
    fn self_alignment_gives_zero_lag() {
        let recording = Stream::new(vec![trace("STA1.Z", noise(500, 1))]).unwrap();
        let aligned =
            pick_with_lags(&recording, &PickerConfig::default(), &Diagnostics::off()).unwrap();

        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].lag_samples, 0);
        assert!((aligned[0].coefficient - 1.0).abs() < 1e-12);
        assert_eq!(aligned[0].pick.time(), start());
    }

    #[test]
    fn shifted_channel_is_picked_late() {
        let config = PickerConfig::default()
            .with_master(MasterChannel::Key(ChannelKey::new("STA1", "Z")));
        let picks = pick(&shifted_recording(), &config, &Diagnostics::off()).unwrap();

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].key(), &ChannelKey::new("STA1", "Z"));
        assert_eq!(picks[0].time(), start());
        assert_eq!(picks[1].key(), &ChannelKey::new("STA2", "Z"));
        assert_eq!(picks[1].time(), start() + Duration::milliseconds(500));
    }

    #[test]
    fn picks_carry_fixed_defaults() {
        let picks = pick(&shifted_recording(), &PickerConfig::default(), &Diagnostics::off())
            .unwrap();
        for p in &picks {
            assert_eq!(p.phase(), Phase::S);
            assert_eq!(p.impulsivity(), Impulsivity::Emergent);
            assert_eq!(p.weight(), PickWeight::FULL);
        }
    }

    #[test]
    fn later_channel_as_master_gives_negative_lag() {
        let config = PickerConfig::default()
            .with_master(MasterChannel::Key(ChannelKey::new("STA2", "Z")));
        let aligned = pick_with_lags(&shifted_recording(), &config, &Diagnostics::off()).unwrap();

        assert_eq!(aligned[0].lag_samples, -50);
        assert_eq!(aligned[1].lag_samples, 0);
        assert_eq!(aligned[0].pick.time(), start() - Duration::milliseconds(500));
    }

    #[test]
    fn external_master_trace_is_used() {
        let recording = shifted_recording();
        let external = recording.first().unwrap().clone();
        let config = PickerConfig::default().with_master(MasterChannel::Trace(external));

        let aligned = pick_with_lags(&recording, &config, &Diagnostics::off()).unwrap();

        assert_eq!(aligned[1].lag_samples, 50);
    }

    #[test]
    fn missing_master_key_fails() {
        let config = PickerConfig::default()
            .with_master(MasterChannel::Key(ChannelKey::new("STA9", "Z")));
        let result = pick(&shifted_recording(), &config, &Diagnostics::off());
        assert!(matches!(result, Err(PickError::MasterNotFound(_))));
    }

    #[test]
    fn empty_recording_fails() {
        let result = pick(&Stream::empty(), &PickerConfig::default(), &Diagnostics::off());
        assert!(matches!(result, Err(PickError::EmptyRecording)));
    }

    #[test]
    fn invalid_fraction_fails_before_anything_else() {
        let config = PickerConfig::default().with_max_shift_fraction(1.2);
        let result = pick(&Stream::empty(), &config, &Diagnostics::off());
        assert!(matches!(result, Err(PickError::InvalidShiftFraction(_))));
    }

    #[test]
    fn invalid_samples_are_neutralised() {
        let base = noise(1000, 21);
        let mut late = shifted(&base, 30);
        for s in &mut late[600..620] {
            *s = f64::NAN;
        }
        let recording =
            Stream::new(vec![trace("STA1.Z", base), trace("STA2.Z", late)]).unwrap();

        let aligned =
            pick_with_lags(&recording, &PickerConfig::default(), &Diagnostics::off()).unwrap();

        assert_eq!(aligned[1].lag_samples, 30);
        assert!(aligned[1].coefficient.is_finite());
    }

    #[test]
    fn all_invalid_channel_still_gets_a_pick() {
        let recording = Stream::new(vec![
            trace("STA1.Z", noise(300, 5)),
            trace("STA2.Z", vec![f64::NAN; 300]),
        ])
        .unwrap();

        let aligned =
            pick_with_lags(&recording, &PickerConfig::default(), &Diagnostics::off()).unwrap();

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[1].lag_samples, 0);
        assert_eq!(aligned[1].coefficient, 0.0);
    }

    #[test]
    fn envelope_mode_aligns_bursts() {
        // Same Gaussian envelope, different carriers
        let burst = |offset: f64, frequency: f64| -> Vec<f64> {
            (0..1000)
                .map(|i| {
                    let d = i as f64 - 400.0 - offset;
                    (-d * d / 2000.0).exp() * (frequency * i as f64).cos()
                })
                .collect()
        };
        let recording = Stream::new(vec![
            trace("STA1.Z", burst(0.0, 0.9)),
            trace("STA2.Z", burst(40.0, 1.4)),
        ])
        .unwrap();
        let config = PickerConfig::default().with_envelope(true);

        let aligned = pick_with_lags(&recording, &config, &Diagnostics::off()).unwrap();

        assert!((aligned[1].lag_samples - 40).abs() <= 2, "{}", aligned[1].lag_samples);
    }

    #[test]
    fn diagnostics_report_windows_and_vectors() {
        let sink = Arc::new(CollectingSink::new());
        let diagnostics = Diagnostics::with_level(5).with_sink(sink.clone());

        let quiet = pick_with_lags(&shifted_recording(), &PickerConfig::default(), &Diagnostics::off())
            .unwrap();
        let verbose =
            pick_with_lags(&shifted_recording(), &PickerConfig::default(), &diagnostics).unwrap();
        assert_eq!(quiet, verbose);

        let events = sink.events();
        assert!(matches!(
            events.first(),
            Some(DiagnosticEvent::MasterSelected { external: false, .. })
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            DiagnosticEvent::ShiftWindow { shift_len: 300, .. }
        )));
        let vectors: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::PickCorrelation {
                    coefficients: Some(c),
                    ..
                } => Some(c.len()),
                _ => None,
            })
            .collect();
        assert_eq!(vectors, vec![601, 601]);
    }

    #[test]
    fn picker_from_settings() {
        let settings = PickingSettings {
            master: Some("STA1.Z".to_string()),
            max_shift_fraction: 0.2,
            ..Default::default()
        };
        let picker = Picker::from_settings(&settings).unwrap();
        assert_eq!(picker.config().max_shift_fraction, 0.2);

        let picks = picker.run(&shifted_recording()).unwrap();
        assert_eq!(picks[1].time(), start() + Duration::milliseconds(500));

        let json = picks_to_json(&picks).unwrap();
        assert!(json.contains("STA2"));
    }
}
