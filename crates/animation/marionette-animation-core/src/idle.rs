//! Breathing and idle sway.
//!
//! Breathing and the arm sway are written unconditionally. Body and cloth sway share channels
//! with tracking, so they are only written while the channel's current magnitude is below its
//! guard threshold; above it, some other layer is driving the channel and idle stays out.

use tracing::trace;

use marionette_api_core::Channel;

use crate::config::{GuardThresholds, IdleConfig};
use crate::params::ParamWriter;

#[derive(Debug, Clone)]
pub struct IdleOscillator {
    cfg: IdleConfig,
    guards: GuardThresholds,
    started_at: Option<f64>,
}

impl IdleOscillator {
    pub fn new(cfg: IdleConfig, guards: GuardThresholds) -> Self {
        Self {
            cfg,
            guards,
            started_at: None,
        }
    }

    /// Forget the phase anchor; the next tick restarts both oscillators at t = 0.
    pub fn reset(&mut self) {
        self.started_at = None;
    }

    /// Breathing value in [0, 1] at `t_s` seconds.
    pub fn breath_at(&self, t_s: f32) -> f32 {
        0.5 + 0.5 * (t_s / self.cfg.breath_period_s).sin()
    }

    /// Unit sway in [-1, 1] at `t_s` seconds.
    pub fn sway_at(&self, t_s: f32) -> f32 {
        (t_s / self.cfg.sway_period_s).sin()
    }

    /// Write one idle frame. Returns the contested channels that were left alone.
    pub fn tick(&mut self, now_ms: f64, out: &mut ParamWriter<'_>) -> Vec<Channel> {
        let start = *self.started_at.get_or_insert(now_ms);
        let t_s = ((now_ms - start) / 1000.0) as f32;

        out.write(Channel::Breath, self.breath_at(t_s));

        let sway = self.sway_at(t_s);
        let contested = [
            (Channel::BodyAngleX, self.cfg.body_sway_amplitude, self.guards.body_angle),
            (Channel::ClothX, self.cfg.cloth_x_sway_amplitude, self.guards.cloth_x),
            (Channel::ClothY, self.cfg.cloth_y_sway_amplitude, self.guards.cloth_y),
        ];
        let mut deferred = Vec::new();
        for (channel, amplitude, guard) in contested {
            match out.read(channel) {
                Some(current) if current.abs() >= guard => {
                    trace!(%channel, current, guard, "idle sway deferring");
                    deferred.push(channel);
                }
                _ => {
                    out.write(channel, sway * amplitude);
                }
            }
        }

        out.write(Channel::ArmSway, sway * self.cfg.arm_sway_amplitude);
        deferred
    }
}
