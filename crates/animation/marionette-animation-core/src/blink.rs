//! Blink state machine.
//!
//! Open → Closing → Closed → Opening → Open. The wake-up that starts a blink is a clock timer
//! ([`crate::TimerKind::Blink`]); once a blink has begun, eye openness is a pure function of the
//! time elapsed since `Closing` began.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BlinkConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkState {
    Open,
    Closing,
    Closed,
    Opening,
}

/// Result of advancing the blink to a point in time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlinkSample {
    pub state: BlinkState,
    /// Eye openness to write, `None` while idle in `Open`.
    pub openness: Option<f32>,
    /// The cycle completed on this update; the caller re-arms the timer.
    pub finished: bool,
}

/// Eye openness `elapsed_ms` after a blink began.
///
/// Linear 1→0 over `close_ms`, 0 for `hold_ms`, linear 0→1 over `open_ms`, then `Open` at 1.
pub fn eye_openness(cfg: &BlinkConfig, elapsed_ms: f64) -> (BlinkState, f32) {
    let t = elapsed_ms.max(0.0);
    let closed_at = cfg.close_ms;
    let opening_at = closed_at + cfg.hold_ms;
    let open_at = cfg.cycle_ms();
    if t < closed_at {
        (BlinkState::Closing, (1.0 - t / cfg.close_ms) as f32)
    } else if t < opening_at {
        (BlinkState::Closed, 0.0)
    } else if t < open_at {
        (BlinkState::Opening, ((t - opening_at) / cfg.open_ms) as f32)
    } else {
        (BlinkState::Open, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Blink {
    cfg: BlinkConfig,
    state: BlinkState,
    started_at: Option<f64>,
    cycles: u64,
}

impl Blink {
    pub fn new(cfg: BlinkConfig) -> Self {
        Self {
            cfg,
            state: BlinkState::Open,
            started_at: None,
            cycles: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> BlinkState {
        self.state
    }

    /// A blink is in progress (any state other than idle `Open`).
    #[inline]
    pub fn is_animating(&self) -> bool {
        self.started_at.is_some()
    }

    /// Completed blink cycles since creation.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Start closing. Ignored while a blink is already running.
    pub fn begin(&mut self, now_ms: f64) {
        if self.started_at.is_none() {
            self.started_at = Some(now_ms);
            self.state = BlinkState::Closing;
        }
    }

    /// Advance to `now_ms`.
    pub fn update(&mut self, now_ms: f64) -> BlinkSample {
        let Some(start) = self.started_at else {
            return BlinkSample {
                state: BlinkState::Open,
                openness: None,
                finished: false,
            };
        };
        let (state, openness) = eye_openness(&self.cfg, now_ms - start);
        self.state = state;
        let finished = state == BlinkState::Open;
        if finished {
            self.started_at = None;
            self.cycles += 1;
        }
        BlinkSample {
            state,
            openness: Some(openness),
            finished,
        }
    }

    /// Delay until the next blink, uniform in `[min_delay_ms, max_delay_ms)`.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.cfg.min_delay_ms..self.cfg.max_delay_ms)
    }

    /// Abandon any running blink and return to `Open`.
    pub fn reset(&mut self) {
        self.state = BlinkState::Open;
        self.started_at = None;
    }
}
