//! Puppet runtime seam.
//!
//! The rendering runtime owns the model, its parameter table and its motion player. The engine
//! talks to it only through [`PuppetRuntime`]; [`HeadlessPuppet`] is the in-memory stand-in for
//! tests and headless hosts.

use hashbrown::HashSet;
use tracing::debug;

use marionette_api_core::{read_aliases, Channel, ParamTable, ParameterTable};

use crate::error::AvatarError;
use crate::motion::MotionClip;

pub trait PuppetRuntime {
    /// Live parameter table of the loaded model, `None` while no model is present.
    fn parameters(&mut self) -> Option<&mut dyn ParameterTable>;

    /// Motion clips bundled with the loaded model.
    fn motion_clips(&self) -> Vec<MotionClip>;

    /// Ask the runtime's motion player to start `clip`.
    fn start_motion(&mut self, clip: &MotionClip) -> Result<(), AvatarError>;
}

/// Model load lifecycle as reported by the host.
#[derive(Debug, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(AvatarError),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn error(&self) -> Option<&AvatarError> {
        match self {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// In-memory puppet: a [`ParamTable`], a clip list and a log of playback requests.
#[derive(Debug, Default)]
pub struct HeadlessPuppet {
    table: Option<ParamTable>,
    clips: Vec<MotionClip>,
    requests: Vec<MotionClip>,
    failing: HashSet<String>,
    fail_all: bool,
}

impl HeadlessPuppet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puppet with `table` already loaded.
    pub fn with_params(mut self, table: ParamTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_clips(mut self, clips: Vec<MotionClip>) -> Self {
        self.clips = clips;
        self
    }

    /// Swap in a (new) model table.
    pub fn load(&mut self, table: ParamTable) {
        self.table = Some(table);
    }

    /// Drop the model; subsequent ticks see no table.
    pub fn unload(&mut self) -> Option<ParamTable> {
        self.table.take()
    }

    pub fn table(&self) -> Option<&ParamTable> {
        self.table.as_ref()
    }

    /// Current value behind `channel`'s first present alias.
    pub fn value(&self, channel: Channel) -> Option<f32> {
        let table = self.table.as_ref()?;
        read_aliases(table, channel.aliases())
    }

    /// Every clip the engine asked to play, oldest first. Failed requests included.
    pub fn requests(&self) -> &[MotionClip] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Make playback of `file` fail.
    pub fn fail_motion(&mut self, file: impl Into<String>) {
        self.failing.insert(file.into());
    }

    pub fn fail_all_motions(&mut self, fail: bool) {
        self.fail_all = fail;
    }
}

impl PuppetRuntime for HeadlessPuppet {
    fn parameters(&mut self) -> Option<&mut dyn ParameterTable> {
        self.table.as_mut().map(|t| t as &mut dyn ParameterTable)
    }

    fn motion_clips(&self) -> Vec<MotionClip> {
        self.clips.clone()
    }

    fn start_motion(&mut self, clip: &MotionClip) -> Result<(), AvatarError> {
        self.requests.push(clip.clone());
        if self.table.is_none() {
            return Err(AvatarError::playback(&clip.file, "no model loaded"));
        }
        if self.fail_all || self.failing.contains(&clip.file) {
            return Err(AvatarError::playback(&clip.file, "motion player rejected clip"));
        }
        debug!(group = %clip.group, index = clip.index, "headless motion started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_api_core::ParamDef;

    fn puppet() -> HeadlessPuppet {
        HeadlessPuppet::new()
            .with_params(ParamTable::new(vec![ParamDef::new("PARAM_ANGLE_X", -30.0, 30.0, 0.0)]))
            .with_clips(vec![MotionClip::new("Idle", 0, "idle.motion3.json")])
    }

    #[test]
    fn value_reads_through_aliases() {
        let mut p = puppet();
        let table = p.parameters().expect("table");
        marionette_api_core::write_aliases(table, Channel::AngleX.aliases(), 12.0);
        assert_eq!(p.value(Channel::AngleX), Some(12.0));
        assert_eq!(p.value(Channel::AngleY), None);
    }

    #[test]
    fn failures_are_recorded_and_returned() {
        let mut p = puppet();
        let clip = p.motion_clips()[0].clone();
        assert!(p.start_motion(&clip).is_ok());
        p.fail_motion("idle.motion3.json");
        let err = p.start_motion(&clip).unwrap_err();
        assert!(matches!(err, AvatarError::Playback { .. }));
        assert_eq!(p.requests().len(), 2);
    }

    #[test]
    fn unloaded_puppet_has_no_table() {
        let mut p = puppet();
        assert!(p.unload().is_some());
        assert!(p.parameters().is_none());
        assert_eq!(p.value(Channel::AngleX), None);
    }
}
