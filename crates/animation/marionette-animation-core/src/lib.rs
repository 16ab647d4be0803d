//! Marionette animation core (runtime-agnostic)
//!
//! Drives a puppet's parameter table from several independent animation layers:
//! idle breathing and sway with a blink state machine, pointer-follow gaze tracking,
//! timeline or oscillator lip-sync, and mood-driven expressions with discrete motion
//! selection. The host owns the frame scheduler and calls [`Avatar::tick`] once per display
//! frame; the puppet runtime is reached only through [`PuppetRuntime`].

pub mod avatar;
pub mod blink;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod idle;
pub mod lipsync;
pub mod mood;
pub mod motion;
pub mod outputs;
pub mod params;
pub mod pointer;
pub mod runtime;
pub mod tracking;

// Re-exports for hosts
pub use avatar::Avatar;
pub use blink::{Blink, BlinkSample, BlinkState};
pub use clock::{Clock, Layer, TimerKind};
pub use config::{
    AxisConfig, BlinkConfig, Config, GuardThresholds, IdleConfig, LipSyncConfig, MotionConfig,
    TrackingConfig,
};
pub use error::AvatarError;
pub use ids::TaskHandle;
pub use idle::IdleOscillator;
pub use lipsync::{LipSyncPlayer, LipSyncTimeline, MouthShape, VisemeEvent};
pub use mood::{Expression, Mood};
pub use motion::{MotionCatalog, MotionClip, MotionTag};
pub use outputs::{AvatarEvent, Frame, StopReason};
pub use params::{ConflictLog, FrameLedger, ParamWriter};
pub use pointer::{PointerEvent, PointerKind, PointerQueue, PointerSource, SurfaceRect};
pub use runtime::{HeadlessPuppet, LoadState, PuppetRuntime};
pub use tracking::{AxisKind, GazeTracker, TrackingAxis, Vec2};
pub use marionette_api_core::{Channel, ParamDef, ParamTable, ParameterTable, WriteBatch, WriteOp};
