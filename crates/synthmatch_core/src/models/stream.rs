//! Multi-channel streams: recordings and templates.
//!
//! A stream keeps its channels in an explicit order and indexes them by
//! [`ChannelKey`] so lookups never depend on scanning trace metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::trace::{ChannelKey, ChannelTrace};
use super::{ModelError, ModelResult};

/// An ordered set of channel traces with unique keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChannelTrace>", into = "Vec<ChannelTrace>")]
pub struct Stream {
    traces: Vec<ChannelTrace>,
    index: HashMap<ChannelKey, usize>,
}

/// An observed waveform set to be matched or picked.
pub type Recording = Stream;

/// A reference waveform set of known origin.
pub type Template = Stream;

impl Stream {
    /// Create an empty stream.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a stream from traces, rejecting duplicate keys.
    pub fn new(traces: Vec<ChannelTrace>) -> ModelResult<Self> {
        let mut stream = Self::with_capacity(traces.len());
        for trace in traces {
            stream.push(trace)?;
        }
        Ok(stream)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            traces: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Append a trace at the end of the channel order.
    pub fn push(&mut self, trace: ChannelTrace) -> ModelResult<()> {
        if self.index.contains_key(&trace.key) {
            return Err(ModelError::DuplicateChannel(trace.key));
        }
        self.index.insert(trace.key.clone(), self.traces.len());
        self.traces.push(trace);
        Ok(())
    }

    /// Look up a trace by key.
    pub fn get(&self, key: &ChannelKey) -> Option<&ChannelTrace> {
        self.index.get(key).map(|&i| &self.traces[i])
    }

    /// Check whether a channel is present.
    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.index.contains_key(key)
    }

    /// Ordered list of channel keys.
    pub fn keys(&self) -> Vec<ChannelKey> {
        self.traces.iter().map(|t| t.key.clone()).collect()
    }

    /// Remove a trace by key, keeping the order of the others.
    pub fn remove(&mut self, key: &ChannelKey) -> Option<ChannelTrace> {
        let position = self.index.remove(key)?;
        let removed = self.traces.remove(position);
        self.rebuild_index();
        Some(removed)
    }

    /// Keep only the channels for which `keep` returns true.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&ChannelKey) -> bool) {
        self.traces.retain(|t| keep(&t.key));
        self.rebuild_index();
    }

    /// First trace in channel order.
    pub fn first(&self) -> Option<&ChannelTrace> {
        self.traces.first()
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check if the stream has no channels.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Iterate over traces in channel order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChannelTrace> {
        self.traces.iter()
    }

    /// Borrow the traces as a slice.
    pub fn traces(&self) -> &[ChannelTrace] {
        &self.traces
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .traces
            .iter()
            .enumerate()
            .map(|(i, t)| (t.key.clone(), i))
            .collect();
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.traces == other.traces
    }
}

impl<'a> IntoIterator for &'a Stream {
    type Item = &'a ChannelTrace;
    type IntoIter = std::slice::Iter<'a, ChannelTrace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.iter()
    }
}

impl TryFrom<Vec<ChannelTrace>> for Stream {
    type Error = ModelError;

    fn try_from(traces: Vec<ChannelTrace>) -> Result<Self, Self::Error> {
        Self::new(traces)
    }
}

impl From<Stream> for Vec<ChannelTrace> {
    fn from(stream: Stream) -> Self {
        stream.traces
    }
}
