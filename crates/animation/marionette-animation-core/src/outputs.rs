//! Output contracts of one avatar frame.
//!
//! A frame carries the raw parameter writes applied during the tick, in application order and
//! keyed by the resolved parameter id, plus a separate list of semantic events. Hosts that
//! render straight from the live table can ignore the writes and read only the events.

use serde::{Deserialize, Serialize};

use marionette_api_core::{Channel, WriteBatch};

use crate::clock::Layer;
use crate::mood::Mood;
use crate::params::ConflictLog;

/// Why a layer's task ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit stop call.
    Requested,
    /// Tracking reached its targets.
    Converged,
    /// Model or parameter table missing at tick time.
    ModelUnavailable,
    Teardown,
    /// The other lip-sync mode took over.
    Replaced,
}

/// Discrete semantic signals emitted by control calls and ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AvatarEvent {
    LayerStarted {
        layer: Layer,
    },
    LayerStopped {
        layer: Layer,
        reason: StopReason,
    },
    /// Contested channels idle sway is leaving alone; sent when the set changes, empty once
    /// idle owns every channel again.
    IdleDeferred {
        channels: Vec<Channel>,
    },
    BlinkStarted,
    BlinkFinished {
        next_blink_in_ms: f64,
    },
    TrackingConverged {
        ticks: u32,
    },
    MoodApplied {
        mood: Mood,
        channels: usize,
    },
    MotionRequested {
        group: String,
        index: usize,
        file: String,
    },
    MotionFailed {
        clip: String,
        message: String,
    },
    Ready {
        clips: usize,
    },
    LoadFailed {
        message: String,
    },
}

/// Everything that happened during one [`crate::Avatar::tick`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Frame {
    pub frame: u64,
    pub now_ms: f64,
    /// Raw writes in application order (frame order of layers, then write order).
    pub writes: WriteBatch,
    pub conflicts: Vec<ConflictLog>,
    pub events: Vec<AvatarEvent>,
}

impl Frame {
    /// Nothing was written and nothing happened.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.conflicts.is_empty() && self.events.is_empty()
    }

    pub fn has_event(&self, pred: impl Fn(&AvatarEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }

    pub fn stopped(&self, layer: Layer) -> Option<StopReason> {
        self.events.iter().find_map(|e| match e {
            AvatarEvent::LayerStopped { layer: l, reason } if *l == layer => Some(*reason),
            _ => None,
        })
    }
}
