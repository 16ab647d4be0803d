//! The avatar: control surface and per-frame scheduler.
//!
//! Control calls (mood, speech, tracking, idle) only flip layer state and queue events; the
//! recurring work happens in [`Avatar::tick`], which the host calls once per display frame.
//! Mood expressions and stop resets are the exception and write the table synchronously.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use marionette_api_core::Channel;

use crate::blink::{Blink, BlinkState};
use crate::clock::{Clock, Layer, TimerKind};
use crate::config::Config;
use crate::error::AvatarError;
use crate::ids::TaskHandle;
use crate::idle::IdleOscillator;
use crate::lipsync::{LipSyncPlayer, LipSyncTimeline};
use crate::mood::Mood;
use crate::motion::{MotionCatalog, MotionClip};
use crate::outputs::{AvatarEvent, Frame, StopReason};
use crate::params::{FrameLedger, ParamWriter};
use crate::pointer::{PointerEvent, PointerSource, SurfaceRect};
use crate::runtime::{LoadState, PuppetRuntime};
use crate::tracking::GazeTracker;

pub struct Avatar<R: PuppetRuntime> {
    cfg: Config,
    runtime: R,
    load: LoadState,
    clock: Clock,
    blink: Blink,
    idle: IdleOscillator,
    idle_deferred: Vec<Channel>,
    tracker: GazeTracker,
    tracking_ticks: u32,
    lip_sync: LipSyncPlayer,
    catalog: MotionCatalog,
    mood: Option<Mood>,
    pointer: Option<Box<dyn PointerSource>>,
    pointer_scratch: Vec<PointerEvent>,
    rng: StdRng,
    on_ready: Option<Box<dyn FnOnce()>>,
    ready_fired: bool,
    pending: Vec<AvatarEvent>,
    ledger: FrameLedger,
    frame: Frame,
}

impl<R: PuppetRuntime> Avatar<R> {
    /// Create an avatar over `runtime`. The model counts as loading until the host reports
    /// [`Avatar::model_loaded`] or [`Avatar::model_failed`].
    pub fn new(runtime: R, cfg: Config) -> Result<Self, AvatarError> {
        Self::with_rng(runtime, cfg, StdRng::from_entropy())
    }

    /// Like [`Avatar::new`] with a fixed seed for blink delays and clip selection.
    pub fn with_seed(runtime: R, cfg: Config, seed: u64) -> Result<Self, AvatarError> {
        Self::with_rng(runtime, cfg, StdRng::seed_from_u64(seed))
    }

    fn with_rng(runtime: R, cfg: Config, rng: StdRng) -> Result<Self, AvatarError> {
        cfg.validate()?;
        Ok(Self {
            blink: Blink::new(cfg.blink.clone()),
            idle: IdleOscillator::new(cfg.idle.clone(), cfg.guards.clone()),
            tracker: GazeTracker::new(&cfg.tracking),
            lip_sync: LipSyncPlayer::new(cfg.lip_sync.oscillator_step),
            cfg,
            runtime,
            load: LoadState::Loading,
            clock: Clock::new(),
            idle_deferred: Vec::new(),
            tracking_ticks: 0,
            catalog: MotionCatalog::default(),
            mood: None,
            pointer: None,
            pointer_scratch: Vec::new(),
            rng,
            on_ready: None,
            ready_fired: false,
            pending: Vec::new(),
            ledger: FrameLedger::new(),
            frame: Frame::default(),
        })
    }

    // ----- accessors -----

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn catalog(&self) -> &MotionCatalog {
        &self.catalog
    }

    pub fn mood(&self) -> Option<Mood> {
        self.mood
    }

    pub fn blink_state(&self) -> BlinkState {
        self.blink.state()
    }

    pub fn tracker(&self) -> &GazeTracker {
        &self.tracker
    }

    pub fn lip_sync(&self) -> &LipSyncPlayer {
        &self.lip_sync
    }

    /// Output of the most recent tick.
    pub fn last_frame(&self) -> &Frame {
        &self.frame
    }

    /// Some task or timer is still scheduled.
    pub fn is_active(&self) -> bool {
        !self.clock.is_retired()
    }

    // ----- load lifecycle -----

    /// The host finished loading the puppet: discover the catalog, request the initial idle
    /// motion, then fire `on_ready`. Calling it again after a reload rebuilds the catalog.
    pub fn model_loaded(&mut self) {
        self.catalog = MotionCatalog::new(self.runtime.motion_clips());
        self.load = LoadState::Ready;
        info!(clips = self.catalog.len(), "puppet model ready");

        if self.cfg.motion.play_idle_on_ready {
            let group = self.cfg.motion.idle_group.as_str();
            match self.catalog.select_by_name(group, &mut self.rng).cloned() {
                Some(clip) => self.request_motion(&clip),
                None => debug!(group, "no idle motion in catalog"),
            }
        }

        self.pending.push(AvatarEvent::Ready {
            clips: self.catalog.len(),
        });
        self.fire_ready();
    }

    /// The puppet asset or its runtime failed to initialize. Recovery is a later
    /// [`Avatar::model_loaded`].
    pub fn model_failed(&mut self, reason: impl Into<String>) {
        let err = AvatarError::ModelLoad {
            reason: reason.into(),
        };
        warn!(error = %err, "puppet model failed to load");
        self.pending.push(AvatarEvent::LoadFailed {
            message: err.to_string(),
        });
        self.catalog = MotionCatalog::default();
        self.load = LoadState::Failed(err);
    }

    /// Register the ready callback. Fires at most once over the avatar's life; when the model
    /// is already loaded it fires immediately.
    pub fn on_ready(&mut self, callback: impl FnOnce() + 'static) {
        if self.ready_fired {
            return;
        }
        self.on_ready = Some(Box::new(callback));
        if self.load.is_ready() {
            self.fire_ready();
        }
    }

    fn fire_ready(&mut self) {
        if self.ready_fired {
            return;
        }
        if let Some(callback) = self.on_ready.take() {
            self.ready_fired = true;
            callback();
        }
    }

    // ----- motions and mood -----

    /// Request one clip by file name, file stem, group name or tag alias.
    ///
    /// An empty catalog is a silent no-op. Playback failures are logged, not returned.
    pub fn play_motion(&mut self, name: &str) -> Result<(), AvatarError> {
        if self.catalog.is_empty() {
            debug!(name, "motion requested before catalog discovery");
            return Ok(());
        }
        let clip = self
            .catalog
            .select_by_name(name, &mut self.rng)
            .cloned()
            .ok_or_else(|| AvatarError::MotionNotFound {
                name: name.to_string(),
            })?;
        self.request_motion(&clip);
        Ok(())
    }

    /// Apply the mood's static expression now and request one matching motion clip.
    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = Some(mood);
        if let Some(table) = self.runtime.parameters() {
            let channels = mood
                .expression()
                .apply(&mut ParamWriter::untracked(table, Layer::Mood));
            self.pending.push(AvatarEvent::MoodApplied { mood, channels });
        }
        match self.catalog.select_for_mood(mood, &mut self.rng).cloned() {
            Some(clip) => self.request_motion(&clip),
            None => debug!(%mood, "no motion catalog; expression only"),
        }
    }

    /// [`Avatar::set_mood`] from a free-form label. Unknown labels are ignored.
    pub fn set_mood_label(&mut self, label: &str) -> Option<Mood> {
        let Some(mood) = Mood::from_label(label) else {
            debug!(label, "ignoring unknown mood");
            return None;
        };
        self.set_mood(mood);
        Some(mood)
    }

    fn request_motion(&mut self, clip: &MotionClip) {
        self.pending.push(AvatarEvent::MotionRequested {
            group: clip.group.clone(),
            index: clip.index,
            file: clip.file.clone(),
        });
        match self.runtime.start_motion(clip) {
            Ok(()) => debug!(%clip, "motion requested"),
            Err(err) => {
                warn!(%clip, error = %err, "motion playback failed");
                self.pending.push(AvatarEvent::MotionFailed {
                    clip: clip.file.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    // ----- speech -----

    /// Start the fallback mouth oscillator. Ignored while a timeline drives the mouth.
    pub fn start_speaking(&mut self) {
        if self.lip_sync.has_timeline() {
            debug!("timeline lip-sync active; oscillator not started");
            return;
        }
        if self.lip_sync.is_oscillating() {
            return;
        }
        self.lip_sync.start_oscillator();
        self.launch(Layer::Speaking);
    }

    /// Stop the oscillator and close the mouth. No-op when it was not running.
    pub fn stop_speaking(&mut self) {
        if !self.lip_sync.is_oscillating() {
            return;
        }
        self.halt(Layer::Speaking, StopReason::Requested);
        self.close_mouth();
    }

    /// Drive the mouth from `timeline`, anchored at the next tick.
    pub fn start_lip_sync(&mut self, timeline: LipSyncTimeline) -> TaskHandle {
        self.begin_lip_sync(timeline, None)
    }

    /// Drive the mouth from `timeline`, anchored at `started_at_ms` on the tick clock.
    pub fn start_lip_sync_at(&mut self, timeline: LipSyncTimeline, started_at_ms: f64) -> TaskHandle {
        self.begin_lip_sync(timeline, Some(started_at_ms))
    }

    /// Parse and start a timeline. Malformed JSON leaves current lip-sync untouched.
    pub fn start_lip_sync_json(&mut self, json: &str) -> Result<TaskHandle, AvatarError> {
        let timeline = LipSyncTimeline::from_json(json)?;
        Ok(self.start_lip_sync(timeline))
    }

    fn begin_lip_sync(&mut self, timeline: LipSyncTimeline, started_at: Option<f64>) -> TaskHandle {
        self.halt(Layer::Speaking, StopReason::Replaced);
        self.halt(Layer::LipSync, StopReason::Replaced);
        debug!(
            visemes = timeline.visemes().len(),
            duration_ms = timeline.duration_ms(),
            "lip-sync timeline loaded"
        );
        self.lip_sync.load_timeline(timeline, started_at);
        self.launch(Layer::LipSync)
    }

    /// Stop timeline lip-sync and close the mouth.
    pub fn stop_lip_sync(&mut self) {
        self.halt(Layer::LipSync, StopReason::Requested);
        self.lip_sync.clear_timeline();
        self.close_mouth();
    }

    fn close_mouth(&mut self) {
        if let Some(table) = self.runtime.parameters() {
            ParamWriter::untracked(table, Layer::LipSync).write(Channel::MouthOpenY, 0.0);
        }
    }

    // ----- tracking -----

    /// Install a pointer source; its events are drained at the start of every tick.
    pub fn start_eye_tracking(&mut self, source: impl PointerSource + 'static) {
        debug!("pointer source installed");
        self.pointer = Some(Box::new(source));
    }

    /// Drop the pointer source, cancel smoothing and zero every axis.
    pub fn stop_eye_tracking(&mut self) {
        if self.pointer.take().is_some() {
            debug!("pointer source removed");
        }
        self.halt(Layer::Tracking, StopReason::Requested);
        self.tracker.reset();
    }

    /// Retarget all axes from a pointer position on `surface`, starting smoothing if idle.
    pub fn pointer_moved(&mut self, event: PointerEvent, surface: SurfaceRect) {
        self.tracker.aim(surface.normalize(&event));
        if !self.clock.is_running(Layer::Tracking) {
            self.tracking_ticks = 0;
            self.launch(Layer::Tracking);
        }
    }

    fn drain_pointer(&mut self) {
        let Some(source) = self.pointer.as_mut() else {
            return;
        };
        self.pointer_scratch.clear();
        source.drain(&mut self.pointer_scratch);
        let surface = source.surface();
        // only the latest position matters for the target
        if let Some(last) = self.pointer_scratch.last().copied() {
            self.pointer_moved(last, surface);
        }
    }

    // ----- idle -----

    /// Start breathing, sway and blinking.
    pub fn start_idle_animation(&mut self) -> TaskHandle {
        self.launch(Layer::Idle)
    }

    /// Stop idle and clear the blink timer. A blink cut short leaves the eyes open.
    pub fn stop_idle_animation(&mut self) {
        let mid_blink = self.blink.is_animating();
        if self.halt(Layer::Idle, StopReason::Requested) && mid_blink {
            if let Some(table) = self.runtime.parameters() {
                let mut out = ParamWriter::untracked(table, Layer::Idle);
                out.write(Channel::EyeLOpen, 1.0);
                out.write(Channel::EyeROpen, 1.0);
            }
        }
    }

    // ----- lifecycle -----

    /// Cancel every task and timer and drop the pointer source.
    pub fn teardown(&mut self) {
        for layer in Layer::FRAME_ORDER {
            self.halt(layer, StopReason::Teardown);
        }
        self.clock.stop_all();
        self.pointer = None;
        self.tracker.reset();
        self.on_ready = None;
        debug!("avatar torn down");
    }

    fn launch(&mut self, layer: Layer) -> TaskHandle {
        let running = self.clock.is_running(layer);
        let handle = self.clock.start(layer);
        if !running {
            debug!(%layer, handle = handle.0, "layer started");
            self.pending.push(AvatarEvent::LayerStarted { layer });
        }
        handle
    }

    /// Stop a layer's task and drop its transient state. Returns whether it was running.
    fn halt(&mut self, layer: Layer, reason: StopReason) -> bool {
        let Some(handle) = self.clock.stop(layer) else {
            return false;
        };
        match layer {
            Layer::Idle => {
                self.clock.clear_timer(TimerKind::Blink);
                self.blink.reset();
                self.idle.reset();
                self.idle_deferred.clear();
            }
            Layer::Tracking => {
                if reason != StopReason::Converged {
                    self.tracker.reset();
                }
            }
            Layer::LipSync => {
                self.lip_sync.clear_timeline();
            }
            Layer::Speaking => {
                self.lip_sync.stop_oscillator();
            }
            Layer::Mood => {}
        }
        debug!(%layer, ?reason, handle = handle.0, "layer stopped");
        self.pending.push(AvatarEvent::LayerStopped { layer, reason });
        true
    }

    // ----- frame -----

    /// Run one frame at `now_ms` (host clock, milliseconds).
    ///
    /// Layers run in [`Layer::FRAME_ORDER`]. A retired clock returns a frame with no writes
    /// and never touches the runtime; queued control events are still delivered.
    pub fn tick(&mut self, now_ms: f64) -> &Frame {
        self.drain_pointer();

        if self.clock.is_retired() {
            self.frame = Frame {
                frame: self.clock.frame(),
                now_ms,
                events: std::mem::take(&mut self.pending),
                ..Frame::default()
            };
            return &self.frame;
        }

        let frame = self.clock.advance_frame();
        self.ledger.begin(frame);
        for layer in Layer::FRAME_ORDER {
            if self.clock.is_running(layer) {
                self.run_layer(layer, now_ms);
            }
        }

        let (writes, conflicts) = self.ledger.take();
        self.frame = Frame {
            frame,
            now_ms,
            writes,
            conflicts,
            events: std::mem::take(&mut self.pending),
        };
        &self.frame
    }

    fn run_layer(&mut self, layer: Layer, now_ms: f64) {
        let Some(table) = self.runtime.parameters() else {
            self.halt(layer, StopReason::ModelUnavailable);
            return;
        };
        let mut out = ParamWriter::tracked(table, &mut self.ledger, layer);

        let stop = match layer {
            Layer::Idle => {
                let deferred = self.idle.tick(now_ms, &mut out);
                if deferred != self.idle_deferred {
                    debug!(?deferred, "idle sway deferral changed");
                    self.pending.push(AvatarEvent::IdleDeferred {
                        channels: deferred.clone(),
                    });
                    self.idle_deferred = deferred;
                }

                if self.clock.take_expired(TimerKind::Blink, now_ms) {
                    self.blink.begin(now_ms);
                    self.pending.push(AvatarEvent::BlinkStarted);
                }
                let sample = self.blink.update(now_ms);
                if let Some(openness) = sample.openness {
                    out.write(Channel::EyeLOpen, openness);
                    out.write(Channel::EyeROpen, openness);
                }
                let unarmed = !self.blink.is_animating()
                    && self.clock.timer_due(TimerKind::Blink).is_none();
                if unarmed {
                    let delay = self.blink.next_delay(&mut self.rng);
                    self.clock.arm_timer(TimerKind::Blink, now_ms + delay);
                    if sample.finished {
                        debug!(cycles = self.blink.cycles(), next_in_ms = delay, "blink finished");
                        self.pending.push(AvatarEvent::BlinkFinished {
                            next_blink_in_ms: delay,
                        });
                    }
                }
                None
            }
            Layer::Tracking => {
                self.tracking_ticks = self.tracking_ticks.saturating_add(1);
                if self.tracker.tick(&mut out) {
                    debug!(ticks = self.tracking_ticks, "tracking converged");
                    self.pending.push(AvatarEvent::TrackingConverged {
                        ticks: self.tracking_ticks,
                    });
                    Some(StopReason::Converged)
                } else {
                    None
                }
            }
            Layer::LipSync => {
                self.lip_sync.tick_timeline(now_ms, &mut out);
                None
            }
            Layer::Speaking => {
                self.lip_sync.tick_oscillator(&mut out);
                None
            }
            Layer::Mood => None,
        };

        if let Some(reason) = stop {
            self.halt(layer, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HeadlessPuppet;
    use marionette_api_core::{ParamDef, ParamTable};

    fn avatar() -> Avatar<HeadlessPuppet> {
        let puppet = HeadlessPuppet::new().with_params(ParamTable::new(vec![
            ParamDef::new("ParamMouthOpenY", 0.0, 1.0, 0.0),
            ParamDef::new("ParamEyeLOpen", 0.0, 2.0, 1.0),
            ParamDef::new("ParamEyeROpen", 0.0, 2.0, 1.0),
        ]));
        Avatar::with_seed(puppet, Config::default(), 3).expect("valid config")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = Config::default();
        cfg.blink.max_delay_ms = cfg.blink.min_delay_ms;
        assert!(matches!(
            Avatar::new(HeadlessPuppet::new(), cfg),
            Err(AvatarError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn tracking_tick_count_saturates() {
        let mut a = avatar();
        a.pointer_moved(
            PointerEvent::mouse(0.0, 0.0),
            SurfaceRect::new(0.0, 0.0, 100.0, 100.0),
        );
        a.tracking_ticks = u32::MAX;
        a.tick(0.0);
        assert_eq!(a.tracking_ticks, u32::MAX);
        assert!(a.clock().is_running(Layer::Tracking));
    }

    #[test]
    fn fresh_avatar_is_retired() {
        let mut a = avatar();
        assert!(!a.is_active());
        let f = a.tick(16.0);
        assert!(f.is_empty());
        assert_eq!(f.frame, 0);
    }

    #[test]
    fn speaking_is_ignored_during_timeline() {
        let mut a = avatar();
        a.start_lip_sync(LipSyncTimeline::default());
        a.start_speaking();
        assert!(!a.clock().is_running(Layer::Speaking));
        assert!(a.clock().is_running(Layer::LipSync));
    }

    #[test]
    fn timeline_replaces_oscillator() {
        let mut a = avatar();
        a.start_speaking();
        a.tick(0.0);
        a.start_lip_sync(LipSyncTimeline::default());
        let f = a.tick(16.0);
        assert_eq!(f.stopped(Layer::Speaking), Some(StopReason::Replaced));
        assert!(!a.lip_sync().is_oscillating());
    }

    #[test]
    fn stop_speaking_closes_the_mouth() {
        let mut a = avatar();
        a.start_speaking();
        a.tick(0.0);
        a.tick(16.0);
        assert!(a.runtime().value(Channel::MouthOpenY).unwrap() > 0.0);
        a.stop_speaking();
        assert_eq!(a.runtime().value(Channel::MouthOpenY), Some(0.0));
        assert!(!a.is_active());
    }

    #[test]
    fn stopping_idle_mid_blink_reopens_eyes() {
        let mut a = avatar();
        a.start_idle_animation();
        a.tick(0.0);
        let due = a.clock().timer_due(TimerKind::Blink).expect("armed");
        a.tick(due);
        a.tick(due + 120.0);
        assert_eq!(a.runtime().value(Channel::EyeLOpen), Some(0.0));
        a.stop_idle_animation();
        assert_eq!(a.runtime().value(Channel::EyeLOpen), Some(1.0));
        assert_eq!(a.runtime().value(Channel::EyeROpen), Some(1.0));
        assert_eq!(a.clock().timer_count(), 0);
    }
}
