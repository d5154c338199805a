//! Diagnostics collection for matching and picking.
//!
//! The numeric code never prints or plots. It reports what it did through a
//! [`Diagnostics`] handle, which forwards events to `tracing` and, when one is
//! installed, to a caller-supplied [`DiagnosticsSink`] (for example a
//! plotting front end).
//!
//! The verbosity level decides which events are built at all. It never
//! changes a numeric result.
//!
//! | Level | Events |
//! |-------|--------|
//! | 0 | none |
//! | 1 | reconciliation summary, template scores, best match, master selection |
//! | 2 | + per-channel correlation status |
//! | 3 | + shift windows and per-pick correlation values |
//! | 4+ | + full pick correlation vectors |

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::models::ChannelKey;

/// Highest meaningful verbosity level.
pub const MAX_VERBOSITY: u8 = 5;

/// Event emitted by the matching and picking pipelines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Channel sets were reconciled.
    Reconciled {
        required: Vec<ChannelKey>,
        dropped_from_recording: Vec<ChannelKey>,
        removed_from_templates: Vec<ChannelKey>,
        placeholders: Vec<(usize, ChannelKey)>,
    },
    /// One template channel was correlated.
    ChannelCorrelated {
        template_index: usize,
        key: ChannelKey,
        status: String,
        peak: Option<f64>,
    },
    /// One template was scored.
    TemplateScored {
        template_index: usize,
        score: f64,
        peak_offset: Option<usize>,
        live_channels: usize,
        failure: Option<String>,
    },
    /// The best template was chosen.
    BestMatch { index: usize, score: f64 },
    /// The picker chose its master channel.
    MasterSelected { key: ChannelKey, external: bool },
    /// Lag window used for one channel.
    ShiftWindow { key: ChannelKey, shift_len: usize },
    /// Alignment of one channel against the master.
    PickCorrelation {
        key: ChannelKey,
        lag_samples: i64,
        coefficient: f64,
        coefficients: Option<Vec<f64>>,
    },
}

impl DiagnosticEvent {
    /// Minimum verbosity at which this event is emitted.
    pub fn level(&self) -> u8 {
        match self {
            DiagnosticEvent::Reconciled { .. }
            | DiagnosticEvent::TemplateScored { .. }
            | DiagnosticEvent::BestMatch { .. }
            | DiagnosticEvent::MasterSelected { .. } => 1,
            DiagnosticEvent::ChannelCorrelated { .. } => 2,
            DiagnosticEvent::ShiftWindow { .. } | DiagnosticEvent::PickCorrelation { .. } => 3,
        }
    }
}

/// Receives diagnostic events.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

/// Type alias for callback sinks.
pub type DiagnosticsCallback = Box<dyn Fn(&DiagnosticEvent) + Send + Sync>;

/// Sink that forwards each event to a callback.
pub struct CallbackSink {
    callback: DiagnosticsCallback,
}

impl CallbackSink {
    pub fn new(callback: impl Fn(&DiagnosticEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl DiagnosticsSink for CallbackSink {
    fn record(&self, event: DiagnosticEvent) {
        (self.callback)(&event);
    }
}

/// Verbosity level plus an optional sink.
#[derive(Clone, Default)]
pub struct Diagnostics {
    level: u8,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl Diagnostics {
    /// Diagnostics that emit nothing.
    pub fn off() -> Self {
        Self::default()
    }

    /// Diagnostics that only go to `tracing`.
    pub fn with_level(level: u8) -> Self {
        Self {
            level: level.min(MAX_VERBOSITY),
            sink: None,
        }
    }

    /// Attach a sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether events of the given level are emitted.
    pub fn enabled(&self, level: u8) -> bool {
        level > 0 && self.level >= level
    }

    /// Build and emit an event if its level is enabled.
    ///
    /// The closure only runs when the event will be used.
    pub fn emit(&self, build: impl FnOnce() -> DiagnosticEvent) {
        if self.level == 0 {
            return;
        }

        let event = build();
        if !self.enabled(event.level()) {
            return;
        }

        tracing::debug!(target: "synthmatch::diagnostics", event = ?event);

        if let Some(sink) = &self.sink {
            sink.record(event);
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("level", &self.level)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
