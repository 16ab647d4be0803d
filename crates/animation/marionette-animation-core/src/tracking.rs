//! Gaze/pose tracking.
//!
//! A pointer move sets the target of four axes (eye, head, body, cloth); every tick each axis
//! closes a fixed fraction of the gap to its target. The task ends once all four axes sit
//! within their epsilon at the same time, and the next pointer move starts it again.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

use marionette_api_core::Channel;

use crate::config::{AxisConfig, TrackingConfig};
use crate::params::ParamWriter;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    Eye,
    Head,
    Body,
    Cloth,
}

impl AxisKind {
    pub const ALL: [AxisKind; 4] = [AxisKind::Eye, AxisKind::Head, AxisKind::Body, AxisKind::Cloth];

    /// (x, y) channels driven by this axis.
    pub fn channels(self) -> (Channel, Channel) {
        match self {
            AxisKind::Eye => (Channel::EyeBallX, Channel::EyeBallY),
            AxisKind::Head => (Channel::AngleX, Channel::AngleY),
            AxisKind::Body => (Channel::BodyAngleX, Channel::BodyAngleY),
            AxisKind::Cloth => (Channel::ClothX, Channel::ClothY),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackingAxis {
    pub kind: AxisKind,
    pub target: Vec2,
    pub current: Vec2,
    pub lerp: f32,
    pub epsilon: f32,
    sensitivity: Vec2,
}

impl TrackingAxis {
    pub fn new(kind: AxisKind, cfg: &AxisConfig) -> Self {
        Self {
            kind,
            target: Vec2::ZERO,
            current: Vec2::ZERO,
            lerp: cfg.lerp,
            epsilon: cfg.epsilon,
            sensitivity: Vec2::new(cfg.sensitivity_x, cfg.sensitivity_y),
        }
    }

    /// Set the target from a normalized [-1, 1] pointer offset.
    pub fn aim(&mut self, normalized: Vec2) {
        self.target = Vec2::new(
            normalized.x * self.sensitivity.x,
            normalized.y * self.sensitivity.y,
        );
    }

    /// One smoothing step toward the target.
    #[inline]
    pub fn step(&mut self) {
        self.current = self.current + (self.target - self.current) * self.lerp;
    }

    pub fn is_converged(&self) -> bool {
        (self.target.x - self.current.x).abs() <= self.epsilon
            && (self.target.y - self.current.y).abs() <= self.epsilon
    }

    pub fn reset(&mut self) {
        self.target = Vec2::ZERO;
        self.current = Vec2::ZERO;
    }
}

#[derive(Clone, Debug)]
pub struct GazeTracker {
    axes: [TrackingAxis; 4],
}

impl GazeTracker {
    pub fn new(cfg: &TrackingConfig) -> Self {
        Self {
            axes: [
                TrackingAxis::new(AxisKind::Eye, &cfg.eye),
                TrackingAxis::new(AxisKind::Head, &cfg.head),
                TrackingAxis::new(AxisKind::Body, &cfg.body),
                TrackingAxis::new(AxisKind::Cloth, &cfg.cloth),
            ],
        }
    }

    pub fn axis(&self, kind: AxisKind) -> &TrackingAxis {
        &self.axes[kind as usize]
    }

    pub fn axes(&self) -> &[TrackingAxis] {
        &self.axes
    }

    /// Retarget every axis from one normalized pointer offset.
    pub fn aim(&mut self, normalized: Vec2) {
        for axis in &mut self.axes {
            axis.aim(normalized);
        }
    }

    pub fn is_converged(&self) -> bool {
        self.axes.iter().all(TrackingAxis::is_converged)
    }

    /// Step every axis and write the results. Returns true once all axes have converged.
    pub fn tick(&mut self, out: &mut ParamWriter<'_>) -> bool {
        for axis in &mut self.axes {
            axis.step();
            let (cx, cy) = axis.kind.channels();
            out.write(cx, axis.current.x);
            out.write(cy, axis.current.y);
        }
        self.is_converged()
    }

    /// Zero all targets and currents.
    pub fn reset(&mut self) {
        for axis in &mut self.axes {
            axis.reset();
        }
    }
}
