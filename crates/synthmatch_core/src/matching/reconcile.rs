//! Channel-set reconciliation between a recording and its templates.
//!
//! After reconciliation the recording and every template expose exactly the
//! same channel keys in the same order. Templates missing a channel get a
//! placeholder of invalid samples; channels the recording cannot provide are
//! removed everywhere.

use std::collections::HashSet;

use crate::models::{ChannelKey, ChannelTrace, Recording, Stream, Template};

use super::types::{MatchError, MatchResult, ReconcileSummary};

/// Reconciled copies of a recording and its templates.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub recording: Recording,
    pub templates: Vec<Template>,
    pub summary: ReconcileSummary,
}

impl Reconciliation {
    /// Shared channel keys, in order.
    pub fn keys(&self) -> &[ChannelKey] {
        &self.summary.required
    }
}

/// Reconcile channel sets.
///
/// The inputs are not modified; the returned streams are independent copies.
///
/// # Errors
/// - [`MatchError::EmptyTemplateList`] if `templates` is empty.
/// - [`MatchError::NoCommonChannels`] if no template channel exists in the
///   recording.
pub fn reconcile(recording: &Recording, templates: &[Template]) -> MatchResult<Reconciliation> {
    if templates.is_empty() {
        return Err(MatchError::EmptyTemplateList);
    }

    // Union of template keys in order of first appearance
    let mut seen = HashSet::new();
    let union: Vec<ChannelKey> = templates
        .iter()
        .flat_map(|t| t.iter().map(|tr| &tr.key))
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect();

    let (required, removed_from_templates): (Vec<ChannelKey>, Vec<ChannelKey>) =
        union.into_iter().partition(|key| recording.contains(key));

    if required.is_empty() {
        return Err(MatchError::NoCommonChannels);
    }

    let required_set: HashSet<&ChannelKey> = required.iter().collect();
    let dropped_from_recording: Vec<ChannelKey> = recording
        .keys()
        .into_iter()
        .filter(|key| !required_set.contains(key))
        .collect();

    let reconciled_recording = collect_stream(
        required
            .iter()
            .filter_map(|key| recording.get(key))
            .cloned(),
    );

    let mut placeholders = Vec::new();
    let reconciled_templates = templates
        .iter()
        .enumerate()
        .map(|(index, template)| {
            collect_stream(required.iter().map(|key| match template.get(key) {
                Some(trace) => trace.clone(),
                None => {
                    placeholders.push((index, key.clone()));
                    placeholder_for(template, &reconciled_recording, key)
                }
            }))
        })
        .collect();

    if !removed_from_templates.is_empty() {
        tracing::debug!(
            "Removed {} template channel(s) absent from recording: {:?}",
            removed_from_templates.len(),
            removed_from_templates
        );
    }

    tracing::debug!(
        "Reconciled {} channel(s) across {} template(s), {} placeholder(s)",
        required.len(),
        templates.len(),
        placeholders.len()
    );

    Ok(Reconciliation {
        recording: reconciled_recording,
        templates: reconciled_templates,
        summary: ReconcileSummary {
            required,
            dropped_from_recording,
            removed_from_templates,
            placeholders,
        },
    })
}

/// Placeholder shaped like the template's first channel.
///
/// A template without channels borrows the recording channel's timing and
/// gets a zero-length placeholder.
fn placeholder_for(template: &Template, recording: &Recording, key: &ChannelKey) -> ChannelTrace {
    match template.first() {
        Some(first) => {
            ChannelTrace::placeholder(key.clone(), first.sample_rate, first.start_time, first.len())
        }
        None => {
            let (rate, start) = recording
                .get(key)
                .map(|tr| (tr.sample_rate, tr.start_time))
                .unwrap_or_default();
            ChannelTrace::placeholder(key.clone(), rate, start, 0)
        }
    }
}

/// Build a stream from traces with keys already known to be unique.
fn collect_stream(traces: impl Iterator<Item = ChannelTrace>) -> Stream {
    let mut stream = Stream::empty();
    for trace in traces {
        // Keys come from a deduplicated list
        if let Err(e) = stream.push(trace) {
            tracing::warn!("Skipping channel during reconciliation: {}", e);
        }
    }
    stream
}
