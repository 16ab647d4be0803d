//! Error types for the avatar engine

/// Errors surfaced by the engine.
///
/// Only [`AvatarError::ModelLoad`] is fatal; it is held in [`crate::LoadState::Failed`].
/// Playback failures are logged and swallowed by the engine, and a missing model or channel
/// is never an error at all.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AvatarError {
    /// Puppet asset or its native runtime failed to initialize
    #[error("Model load failed: {reason}")]
    ModelLoad { reason: String },

    /// Runtime refused or failed to play a motion clip
    #[error("Motion playback failed for {clip}: {reason}")]
    Playback { clip: String, reason: String },

    /// No clip in the catalog answers to the requested name
    #[error("Motion not found: {name}")]
    MotionNotFound { name: String },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Lip-sync timeline JSON could not be parsed
    #[error("Lip-sync timeline parse error: {0}")]
    Timeline(#[from] serde_json::Error),
}

impl AvatarError {
    pub fn playback(clip: impl Into<String>, reason: impl Into<String>) -> Self {
        AvatarError::Playback {
            clip: clip.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        AvatarError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error leaves the avatar without a usable model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AvatarError::ModelLoad { .. })
    }
}
