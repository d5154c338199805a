//! Template matching: find which reference template best explains a recording.
//!
//! # Architecture
//!
//! The pipeline consists of pure functions composed by [`match_templates`]:
//!
//! 1. **Reconciliation** (`reconcile`): align the channel sets of the
//!    recording and all templates.
//!
//! 2. **Correlation** (`correlator`): slide each template channel across the
//!    recording channel; one task per (template, channel) on a worker pool.
//!
//! 3. **Scoring** (`scorer`): sum channel series, take the maximum.
//!
//! 4. **Selection** (`selector`): highest score wins, lowest index on ties.
//!
//! # Usage
//!
//! ```no_run
//! use synthmatch_core::matching::Matcher;
//! use synthmatch_core::models::Stream;
//! # let recording = Stream::empty();
//! # let templates: Vec<Stream> = Vec::new();
//!
//! let matcher = Matcher::with_workers(4).unwrap();
//! let outcome = matcher.run(&recording, &templates).unwrap();
//! println!("best template {} scored {:.3}", outcome.best_index, outcome.best_score);
//! ```

mod correlator;
mod reconcile;
mod scorer;
mod selector;
pub mod types;

pub use correlator::{correlate_all, correlate_channel, correlate_template};
pub use reconcile::{reconcile, Reconciliation};
pub use scorer::score;
pub use selector::select_best;
pub use types::{
    ChannelCorrelation, ChannelStatus, DeadReason, MatchError, MatchOutcome, MatchResult,
    ReconcileSummary, TemplateMatch, TemplateScore, MIN_SCORE, NO_CORRELATION,
};

use crate::config::MatchingSettings;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::models::{Recording, Template};
use crate::pool::{SequentialPool, TaskPool, ThreadPool, DEFAULT_WORKERS};

/// Configuration for template matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Worker threads for channel correlation.
    pub workers: usize,
    /// Diagnostic verbosity (0 = silent).
    pub debug: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            debug: 0,
        }
    }
}

impl From<&MatchingSettings> for MatchConfig {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            workers: settings.workers,
            debug: settings.debug,
        }
    }
}

/// Match a recording against a list of templates.
///
/// Templates whose channels cannot be correlated (for example a template
/// longer than the recording) are kept in the outcome with the minimum score
/// and the reason in [`TemplateMatch::failure`]; they never abort the batch.
///
/// # Errors
/// - [`MatchError::EmptyTemplateList`] if `templates` is empty.
/// - [`MatchError::NoCommonChannels`] if reconciliation leaves no channel.
pub fn match_templates<P: TaskPool>(
    recording: &Recording,
    templates: &[Template],
    pool: &P,
    diagnostics: &Diagnostics,
) -> MatchResult<MatchOutcome> {
    tracing::info!(
        "Matching {}-channel recording against {} template(s)",
        recording.len(),
        templates.len()
    );

    let reconciled = reconcile(recording, templates)?;

    diagnostics.emit(|| DiagnosticEvent::Reconciled {
        required: reconciled.summary.required.clone(),
        dropped_from_recording: reconciled.summary.dropped_from_recording.clone(),
        removed_from_templates: reconciled.summary.removed_from_templates.clone(),
        placeholders: reconciled.summary.placeholders.clone(),
    });

    let correlations = correlate_all(&reconciled.templates, &reconciled.recording, pool);

    let template_matches: Vec<TemplateMatch> = correlations
        .into_iter()
        .enumerate()
        .map(|(index, result)| build_template_match(index, result, diagnostics))
        .collect();

    let scores: Vec<f64> = template_matches.iter().map(|t| t.score.score).collect();
    let (best_index, best_score) = select_best(&scores)?;

    diagnostics.emit(|| DiagnosticEvent::BestMatch {
        index: best_index,
        score: best_score,
    });

    tracing::info!(
        "Best match: template {} with score {:.4}",
        best_index,
        best_score
    );

    Ok(MatchOutcome {
        best_index,
        best_score,
        templates: template_matches,
        reconciliation: reconciled.summary,
    })
}

fn build_template_match(
    index: usize,
    result: MatchResult<Vec<ChannelCorrelation>>,
    diagnostics: &Diagnostics,
) -> TemplateMatch {
    let (channels, failure) = match result {
        Ok(channels) => (channels, None),
        Err(e) => {
            tracing::warn!("Template {} could not be correlated: {}", index, e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    for channel in &channels {
        diagnostics.emit(|| DiagnosticEvent::ChannelCorrelated {
            template_index: index,
            key: channel.key.clone(),
            status: channel.status.to_string(),
            peak: channel.peak(),
        });
    }

    let template_score = score(&channels);

    if failure.is_none() && template_score.live_channels == 0 {
        tracing::warn!("Template {} has no usable channels", index);
    }

    tracing::debug!(
        "Template {}: score={:.4}, live channels={}",
        index,
        template_score.score,
        template_score.live_channels
    );

    diagnostics.emit(|| DiagnosticEvent::TemplateScored {
        template_index: index,
        score: template_score.score,
        peak_offset: template_score.peak_offset,
        live_channels: template_score.live_channels,
        failure: failure.clone(),
    });

    TemplateMatch {
        index,
        score: template_score,
        channels,
        failure,
    }
}

/// Compare a recording to a list of templates of known source.
///
/// Returns the index of the best template and its score, using `workers`
/// threads for the channel correlations.
pub fn synth_compare(
    recording: &Recording,
    templates: &[Template],
    workers: usize,
) -> MatchResult<(usize, f64)> {
    let outcome = Matcher::with_workers(workers)?.run(recording, templates)?;
    Ok((outcome.best_index, outcome.best_score))
}

/// Template matcher bound to a worker pool and diagnostics.
#[derive(Debug)]
pub struct Matcher<P: TaskPool = ThreadPool> {
    pool: P,
    diagnostics: Diagnostics,
}

impl Matcher<ThreadPool> {
    /// Create a matcher with a pool of `workers` threads.
    pub fn with_workers(workers: usize) -> MatchResult<Self> {
        Ok(Self {
            pool: ThreadPool::new(workers)?,
            diagnostics: Diagnostics::off(),
        })
    }

    /// Create a matcher from configuration.
    pub fn from_config(config: &MatchConfig) -> MatchResult<Self> {
        Ok(Self::with_workers(config.workers)?
            .with_diagnostics(Diagnostics::with_level(config.debug)))
    }

    /// Create a matcher from settings.
    pub fn from_settings(settings: &MatchingSettings) -> MatchResult<Self> {
        Self::from_config(&MatchConfig::from(settings))
    }
}

impl Matcher<SequentialPool> {
    /// Create a matcher that runs on the calling thread.
    pub fn sequential() -> Self {
        Self::with_pool(SequentialPool)
    }
}

impl<P: TaskPool> Matcher<P> {
    /// Create a matcher on an existing pool.
    pub fn with_pool(pool: P) -> Self {
        Self {
            pool,
            diagnostics: Diagnostics::off(),
        }
    }

    /// Set the diagnostics handle.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Match a recording against templates.
    pub fn run(&self, recording: &Recording, templates: &[Template]) -> MatchResult<MatchOutcome> {
        match_templates(recording, templates, &self.pool, &self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::models::{ChannelTrace, Stream};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn wave(len: usize, phase: f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 + phase;
                (t * 0.21).sin() * (t * 0.013).cos() + 0.3 * (t * 0.57).sin()
            })
            .collect()
    }

    fn trace(key: &str, samples: Vec<f64>) -> ChannelTrace {
        ChannelTrace::new(
            key.parse().unwrap(),
            100.0,
            Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap(),
            samples,
        )
    }

    fn recording() -> Stream {
        Stream::new(vec![trace("A.Z", wave(600, 0.0)), trace("B.Z", wave(600, 40.0))]).unwrap()
    }

    fn snippet(start: usize) -> Stream {
        Stream::new(vec![
            trace("A.Z", wave(600, 0.0)[start..start + 100].to_vec()),
            trace("B.Z", wave(600, 40.0)[start..start + 100].to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn exact_snippet_wins() {
        let unrelated = Stream::new(vec![
            trace("A.Z", wave(100, 1234.5)),
            trace("B.Z", wave(100, 777.7)),
        ])
        .unwrap();
        let templates = vec![unrelated, snippet(250)];

        let outcome = match_templates(&recording(), &templates, &SequentialPool, &Diagnostics::off())
            .unwrap();

        assert_eq!(outcome.best_index, 1);
        assert!((outcome.best_score - 2.0).abs() < 1e-6);
        assert_eq!(outcome.best().score.peak_offset, Some(250));
    }

    #[test]
    fn oversized_template_degrades_to_minimum() {
        let oversized = Stream::new(vec![trace("A.Z", wave(700, 0.0))]).unwrap();
        let templates = vec![oversized, snippet(10)];

        let outcome = match_templates(&recording(), &templates, &SequentialPool, &Diagnostics::off())
            .unwrap();

        assert_eq!(outcome.best_index, 1);
        assert_eq!(outcome.templates[0].score.score, MIN_SCORE);
        assert!(outcome.templates[0]
            .failure
            .as_deref()
            .unwrap()
            .contains("does not fit"));
    }

    #[test]
    fn empty_template_list_is_rejected() {
        let result = match_templates(&recording(), &[], &SequentialPool, &Diagnostics::off());
        assert!(matches!(result, Err(MatchError::EmptyTemplateList)));
    }

    #[test]
    fn diagnostics_do_not_change_results() {
        let templates = vec![snippet(100), snippet(300)];
        let sink = Arc::new(CollectingSink::new());

        let quiet = Matcher::sequential().run(&recording(), &templates).unwrap();
        let verbose = Matcher::sequential()
            .with_diagnostics(Diagnostics::with_level(5).with_sink(sink.clone()))
            .run(&recording(), &templates)
            .unwrap();

        assert_eq!(quiet, verbose);

        let events = sink.events();
        assert!(matches!(events.first(), Some(DiagnosticEvent::Reconciled { .. })));
        assert!(matches!(events.last(), Some(DiagnosticEvent::BestMatch { .. })));
        let channel_events = events
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::ChannelCorrelated { .. }))
            .count();
        assert_eq!(channel_events, 4);
    }

    #[test]
    fn synth_compare_matches_pipeline() {
        let templates = vec![snippet(50), snippet(400)];
        let (index, score) = synth_compare(&recording(), &templates, 2).unwrap();
        let outcome = Matcher::sequential().run(&recording(), &templates).unwrap();

        assert_eq!(index, outcome.best_index);
        assert_eq!(score, outcome.best_score);
    }

    #[test]
    fn synth_compare_rejects_zero_workers() {
        let result = synth_compare(&recording(), &[snippet(0)], 0);
        assert!(matches!(result, Err(MatchError::Pool(_))));
    }

    #[test]
    fn config_comes_from_settings() {
        let settings = MatchingSettings {
            workers: 2,
            debug: 3,
        };
        let config = MatchConfig::from(&settings);
        assert_eq!(config.workers, 2);
        assert_eq!(config.debug, 3);

        let matcher = Matcher::from_settings(&settings).unwrap();
        assert_eq!(matcher.pool().workers(), 2);
    }

    #[test]
    fn outcome_exports_json() {
        let outcome = Matcher::sequential()
            .run(&recording(), &[snippet(5)])
            .unwrap();
        let json = outcome.to_json().unwrap();
        assert!(json.contains("\"best_index\": 0"));
        assert!(json.contains("\"aggregate\""));
    }
}
