//! Animation clock: the registry of running layer tasks and pending timers.
//!
//! Each layer is an independent cooperative task with its own [`TaskHandle`]. The clock does
//! not call layers itself; [`crate::Avatar::tick`] walks [`Layer::FRAME_ORDER`] and asks the
//! clock which layers are live. Keeping every handle here is what makes teardown
//! deterministic: `stop_all` cancels every task and timer in one place.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{HandleAllocator, TaskHandle};

/// Writers of the parameter table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Breathing, sway and blink.
    Idle,
    /// Pointer-follow gaze/head/body/cloth smoothing.
    Tracking,
    /// Timeline-driven lip-sync.
    LipSync,
    /// Fallback mouth oscillator.
    Speaking,
    /// Static mood expressions. Writes synchronously and never holds a task.
    Mood,
}

impl Layer {
    /// Fixed per-frame order of the recurring layers.
    pub const FRAME_ORDER: [Layer; 4] = [Layer::Idle, Layer::Tracking, Layer::LipSync, Layer::Speaking];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Idle => "idle",
            Layer::Tracking => "tracking",
            Layer::LipSync => "lip_sync",
            Layer::Speaking => "speaking",
            Layer::Mood => "mood",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One-shot wake-ups owned by the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Blink,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Timer {
    handle: TaskHandle,
    due_ms: f64,
}

#[derive(Debug, Default)]
pub struct Clock {
    handles: HandleAllocator,
    tasks: HashMap<Layer, TaskHandle>,
    timers: HashMap<TimerKind, Timer>,
    frame: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a layer's task. Idempotent: a running task keeps its handle.
    pub fn start(&mut self, layer: Layer) -> TaskHandle {
        if let Some(handle) = self.tasks.get(&layer) {
            return *handle;
        }
        let handle = self.handles.alloc();
        self.tasks.insert(layer, handle);
        handle
    }

    /// Cancel a layer's task, returning the handle it held.
    pub fn stop(&mut self, layer: Layer) -> Option<TaskHandle> {
        self.tasks.remove(&layer)
    }

    #[inline]
    pub fn is_running(&self, layer: Layer) -> bool {
        self.tasks.contains_key(&layer)
    }

    /// Running layers in frame order.
    pub fn active_layers(&self) -> impl Iterator<Item = Layer> + '_ {
        Layer::FRAME_ORDER
            .into_iter()
            .filter(move |l| self.tasks.contains_key(l))
    }

    /// Arm (or re-arm) a timer. Re-arming replaces the previous deadline and handle.
    pub fn arm_timer(&mut self, kind: TimerKind, due_ms: f64) -> TaskHandle {
        let handle = self.handles.alloc();
        self.timers.insert(kind, Timer { handle, due_ms });
        handle
    }

    /// Clear a pending timer. Returns whether one was pending.
    pub fn clear_timer(&mut self, kind: TimerKind) -> bool {
        self.timers.remove(&kind).is_some()
    }

    pub fn timer_due(&self, kind: TimerKind) -> Option<f64> {
        self.timers.get(&kind).map(|t| t.due_ms)
    }

    /// Consume the timer if its deadline has passed.
    pub fn take_expired(&mut self, kind: TimerKind, now_ms: f64) -> bool {
        match self.timers.get(&kind) {
            Some(t) if t.due_ms <= now_ms => {
                self.timers.remove(&kind);
                true
            }
            _ => false,
        }
    }

    /// Cancel every task and timer. Returns the layers that were running, in frame order.
    pub fn stop_all(&mut self) -> Vec<Layer> {
        let stopped: Vec<Layer> = self.active_layers().collect();
        self.tasks.clear();
        self.timers.clear();
        stopped
    }

    /// No task and no timer left: the clock has retired itself.
    #[inline]
    pub fn is_retired(&self) -> bool {
        self.tasks.is_empty() && self.timers.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Advance and return the frame counter.
    pub fn advance_frame(&mut self) -> u64 {
        self.frame = self.frame.wrapping_add(1);
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent_and_restart_gets_new_handle() {
        let mut clock = Clock::new();
        let a = clock.start(Layer::Tracking);
        assert_eq!(clock.start(Layer::Tracking), a);
        assert_eq!(clock.stop(Layer::Tracking), Some(a));
        let b = clock.start(Layer::Tracking);
        assert_ne!(a, b);
    }

    #[test]
    fn active_layers_follow_frame_order() {
        let mut clock = Clock::new();
        clock.start(Layer::Speaking);
        clock.start(Layer::Idle);
        clock.start(Layer::Tracking);
        let order: Vec<Layer> = clock.active_layers().collect();
        assert_eq!(order, vec![Layer::Idle, Layer::Tracking, Layer::Speaking]);
    }

    #[test]
    fn timers_expire_once() {
        let mut clock = Clock::new();
        clock.arm_timer(TimerKind::Blink, 100.0);
        assert!(!clock.take_expired(TimerKind::Blink, 99.0));
        assert!(clock.take_expired(TimerKind::Blink, 100.0));
        assert!(!clock.take_expired(TimerKind::Blink, 200.0));
    }

    #[test]
    fn retires_when_nothing_is_pending() {
        let mut clock = Clock::new();
        assert!(clock.is_retired());
        clock.start(Layer::Idle);
        clock.arm_timer(TimerKind::Blink, 10.0);
        assert!(!clock.is_retired());
        assert_eq!(clock.stop_all(), vec![Layer::Idle]);
        assert!(clock.is_retired());
        assert_eq!(clock.timer_count(), 0);
    }
}
