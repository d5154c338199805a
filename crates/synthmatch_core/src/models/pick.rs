//! Arrival-time picks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trace::ChannelKey;

/// Seismic phase label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    P,
    #[default]
    S,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::P => write!(f, "P"),
            Phase::S => write!(f, "S"),
        }
    }
}

/// Onset character of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impulsivity {
    /// Sharp onset (`I`).
    Impulsive,
    /// Gradual onset (`E`).
    #[default]
    Emergent,
    /// Unclear onset (`Q`).
    Questionable,
}

impl Impulsivity {
    /// Single-letter code used in bulletin formats.
    pub fn code(&self) -> char {
        match self {
            Impulsivity::Impulsive => 'I',
            Impulsivity::Emergent => 'E',
            Impulsivity::Questionable => 'Q',
        }
    }
}

impl fmt::Display for Impulsivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impulsivity::Impulsive => write!(f, "impulsive"),
            Impulsivity::Emergent => write!(f, "emergent"),
            Impulsivity::Questionable => write!(f, "questionable"),
        }
    }
}

/// Pick weight on the Nordic 0-4 scale, where 0 is full confidence and 4 is
/// "do not use".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickWeight(u8);

impl PickWeight {
    /// Full confidence.
    pub const FULL: PickWeight = PickWeight(0);
    /// Weight that excludes the pick from location.
    pub const UNUSED: PickWeight = PickWeight(4);

    /// Create a weight, clamped to the 0-4 scale.
    pub fn new(value: u8) -> Self {
        Self(value.min(4))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for PickWeight {
    fn default() -> Self {
        Self::FULL
    }
}

/// A derived arrival-time annotation for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    key: ChannelKey,
    phase: Phase,
    impulsivity: Impulsivity,
    weight: PickWeight,
    time: DateTime<Utc>,
}

impl Pick {
    /// Create a pick with the default phase, impulsivity and weight.
    pub fn new(key: ChannelKey, time: DateTime<Utc>) -> Self {
        Self {
            key,
            phase: Phase::default(),
            impulsivity: Impulsivity::default(),
            weight: PickWeight::default(),
            time,
        }
    }

    /// Set the phase label.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the onset character.
    pub fn with_impulsivity(mut self, impulsivity: Impulsivity) -> Self {
        self.impulsivity = impulsivity;
        self
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: PickWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn station(&self) -> &str {
        &self.key.station
    }

    pub fn channel(&self) -> &str {
        &self.key.channel
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn impulsivity(&self) -> Impulsivity {
        self.impulsivity
    }

    pub fn weight(&self) -> PickWeight {
        self.weight
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} w{} {}",
            self.key,
            self.impulsivity.code(),
            self.phase,
            self.weight.value(),
            self.time.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        )
    }
}
