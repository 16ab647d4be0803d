//! Engine configuration.
//!
//! Every timing constant, sensitivity and guard threshold the layers use lives here so hosts
//! can tune a puppet without touching layer code. Defaults reproduce the stock behavior.

use serde::{Deserialize, Serialize};

use crate::error::AvatarError;

/// Top-level configuration, one section per layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub blink: BlinkConfig,
    pub idle: IdleConfig,
    pub guards: GuardThresholds,
    pub tracking: TrackingConfig,
    pub lip_sync: LipSyncConfig,
    pub motion: MotionConfig,
}

/// Blink cycle timings, all in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Lower bound (inclusive) of the random delay between blinks.
    pub min_delay_ms: f64,
    /// Upper bound (exclusive) of the random delay between blinks.
    pub max_delay_ms: f64,
    pub close_ms: f64,
    pub hold_ms: f64,
    pub open_ms: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 3000.0,
            max_delay_ms: 6000.0,
            close_ms: 100.0,
            hold_ms: 50.0,
            open_ms: 100.0,
        }
    }
}

impl BlinkConfig {
    /// Full closing + closed + opening duration.
    #[inline]
    pub fn cycle_ms(&self) -> f64 {
        self.close_ms + self.hold_ms + self.open_ms
    }
}

/// Breathing and idle sway oscillators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Breathing is `0.5 + 0.5 * sin(t / breath_period_s)`.
    pub breath_period_s: f32,
    /// Sway is `sin(t / sway_period_s)`; must be slower than breathing.
    pub sway_period_s: f32,
    pub body_sway_amplitude: f32,
    pub cloth_x_sway_amplitude: f32,
    pub cloth_y_sway_amplitude: f32,
    pub arm_sway_amplitude: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            breath_period_s: 2.0,
            sway_period_s: 5.0,
            body_sway_amplitude: 3.0,
            cloth_x_sway_amplitude: 0.1,
            cloth_y_sway_amplitude: 0.05,
            arm_sway_amplitude: 0.05,
        }
    }
}

/// Magnitudes above which idle sway defers to whatever already drives a channel.
///
/// These are empirical values carried over from tuning against stock puppets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardThresholds {
    pub body_angle: f32,
    pub cloth_x: f32,
    pub cloth_y: f32,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            body_angle: 5.0,
            cloth_x: 0.2,
            cloth_y: 0.1,
        }
    }
}

/// Per-axis smoothing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Scale from normalized pointer offset [-1, 1] to channel units.
    pub sensitivity_x: f32,
    pub sensitivity_y: f32,
    /// Fraction of the remaining distance covered per tick, in (0, 1].
    pub lerp: f32,
    /// Convergence tolerance in channel units.
    pub epsilon: f32,
}

impl AxisConfig {
    pub const fn new(sensitivity_x: f32, sensitivity_y: f32, lerp: f32, epsilon: f32) -> Self {
        Self {
            sensitivity_x,
            sensitivity_y,
            lerp,
            epsilon,
        }
    }

    fn validate(&self, name: &str) -> Result<(), AvatarError> {
        if !(self.lerp > 0.0 && self.lerp <= 1.0) {
            return Err(AvatarError::invalid_config(format!(
                "tracking.{name}.lerp must be in (0, 1], got {}",
                self.lerp
            )));
        }
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(AvatarError::invalid_config(format!(
                "tracking.{name}.epsilon must be positive and finite"
            )));
        }
        if !self.sensitivity_x.is_finite() || !self.sensitivity_y.is_finite() {
            return Err(AvatarError::invalid_config(format!(
                "tracking.{name} sensitivities must be finite"
            )));
        }
        Ok(())
    }
}

/// Gaze/pose tracking axes. Head and body use angular ranges, eye and cloth unit ranges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub eye: AxisConfig,
    pub head: AxisConfig,
    pub body: AxisConfig,
    pub cloth: AxisConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            eye: AxisConfig::new(1.0, 1.0, 0.15, 0.005),
            head: AxisConfig::new(30.0, 30.0, 0.15, 0.01),
            body: AxisConfig::new(10.0, 10.0, 0.15, 0.01),
            cloth: AxisConfig::new(0.5, 0.3, 0.08, 0.005),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Mouth aperture change per tick of the fallback oscillator.
    pub oscillator_step: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            oscillator_step: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Motion group requested once the model is ready.
    pub idle_group: String,
    /// Request an idle motion when the model finishes loading.
    pub play_idle_on_ready: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            idle_group: "Idle".to_string(),
            play_idle_on_ready: true,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON configuration; missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, AvatarError> {
        let cfg: Config = serde_json::from_str(s)
            .map_err(|e| AvatarError::invalid_config(format!("config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AvatarError> {
        let b = &self.blink;
        if !(b.min_delay_ms >= 0.0) || !(b.max_delay_ms > b.min_delay_ms) {
            return Err(AvatarError::invalid_config(
                "blink delay window must satisfy 0 <= min_delay_ms < max_delay_ms",
            ));
        }
        if !(b.close_ms > 0.0) || !(b.hold_ms >= 0.0) || !(b.open_ms > 0.0) {
            return Err(AvatarError::invalid_config(
                "blink phases must be positive (hold may be zero)",
            ));
        }

        let i = &self.idle;
        if !(i.breath_period_s > 0.0) || !(i.sway_period_s > 0.0) {
            return Err(AvatarError::invalid_config(
                "idle oscillator periods must be positive",
            ));
        }

        // Sway at or above its own guard would lock itself out of the channel.
        let g = &self.guards;
        let pairs = [
            ("body_angle", i.body_sway_amplitude, g.body_angle),
            ("cloth_x", i.cloth_x_sway_amplitude, g.cloth_x),
            ("cloth_y", i.cloth_y_sway_amplitude, g.cloth_y),
        ];
        for (name, amplitude, guard) in pairs {
            if !(guard >= 0.0) {
                return Err(AvatarError::invalid_config(format!(
                    "guards.{name} must be non-negative"
                )));
            }
            if amplitude.abs() >= guard {
                return Err(AvatarError::invalid_config(format!(
                    "idle sway amplitude for {name} ({amplitude}) must stay below its guard ({guard})"
                )));
            }
        }

        self.tracking.eye.validate("eye")?;
        self.tracking.head.validate("head")?;
        self.tracking.body.validate("body")?;
        self.tracking.cloth.validate("cloth")?;

        let step = self.lip_sync.oscillator_step;
        if !(step > 0.0 && step <= 1.0) {
            return Err(AvatarError::invalid_config(format!(
                "lip_sync.oscillator_step must be in (0, 1], got {step}"
            )));
        }

        Ok(())
    }

    #[inline]
    pub fn with_blink(mut self, blink: BlinkConfig) -> Self {
        self.blink = blink;
        self
    }

    #[inline]
    pub fn with_idle(mut self, idle: IdleConfig) -> Self {
        self.idle = idle;
        self
    }

    #[inline]
    pub fn with_guards(mut self, guards: GuardThresholds) -> Self {
        self.guards = guards;
        self
    }

    #[inline]
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    #[inline]
    pub fn with_oscillator_step(mut self, step: f32) -> Self {
        self.lip_sync.oscillator_step = step;
        self
    }

    #[inline]
    pub fn with_idle_group(mut self, group: impl Into<String>) -> Self {
        self.motion.idle_group = group.into();
        self
    }
}
