//! Mood vocabulary, static expressions and the mood → motion tag mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

use marionette_api_core::Channel;

use crate::motion::MotionTag;
use crate::params::ParamWriter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Excited,
    Thinking,
    Neutral,
    Shy,
    Concerned,
    Dramatic,
    Smug,
    Sad,
    Surprised,
    Angry,
    Sleepy,
}

/// Eye openness and brow height for a mood. Written to both eyes and both brows.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub eye_open: f32,
    pub brow_y: f32,
}

impl Expression {
    pub const fn new(eye_open: f32, brow_y: f32) -> Self {
        Self { eye_open, brow_y }
    }

    /// Write the expression. Returns how many channels the model accepted.
    pub fn apply(&self, out: &mut ParamWriter<'_>) -> usize {
        [
            (Channel::EyeLOpen, self.eye_open),
            (Channel::EyeROpen, self.eye_open),
            (Channel::BrowLY, self.brow_y),
            (Channel::BrowRY, self.brow_y),
        ]
        .into_iter()
        .filter(|&(channel, value)| out.write(channel, value))
        .count()
    }
}

impl Mood {
    pub const ALL: [Mood; 12] = [
        Mood::Happy,
        Mood::Excited,
        Mood::Thinking,
        Mood::Neutral,
        Mood::Shy,
        Mood::Concerned,
        Mood::Dramatic,
        Mood::Smug,
        Mood::Sad,
        Mood::Surprised,
        Mood::Angry,
        Mood::Sleepy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Thinking => "thinking",
            Mood::Neutral => "neutral",
            Mood::Shy => "shy",
            Mood::Concerned => "concerned",
            Mood::Dramatic => "dramatic",
            Mood::Smug => "smug",
            Mood::Sad => "sad",
            Mood::Surprised => "surprised",
            Mood::Angry => "angry",
            Mood::Sleepy => "sleepy",
        }
    }

    /// Case-insensitive lookup; `None` for labels outside the vocabulary.
    pub fn from_label(label: &str) -> Option<Mood> {
        let label = label.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(label))
    }

    pub fn expression(self) -> Expression {
        match self {
            Mood::Happy => Expression::new(0.8, 0.3),
            Mood::Excited => Expression::new(1.1, 0.5),
            Mood::Thinking => Expression::new(0.9, 0.2),
            Mood::Neutral => Expression::new(1.0, 0.0),
            Mood::Shy => Expression::new(0.7, -0.2),
            Mood::Concerned => Expression::new(0.7, -0.4),
            Mood::Dramatic => Expression::new(1.2, 0.6),
            Mood::Smug => Expression::new(0.6, 0.1),
            Mood::Sad => Expression::new(0.6, -0.5),
            Mood::Surprised => Expression::new(1.3, 0.8),
            Mood::Angry => Expression::new(0.8, -0.6),
            Mood::Sleepy => Expression::new(0.3, -0.2),
        }
    }

    /// Motion tags that express this mood, most specific first.
    pub fn motion_tags(self) -> &'static [MotionTag] {
        match self {
            Mood::Happy => &[MotionTag::Happy, MotionTag::Greeting],
            Mood::Excited => &[MotionTag::Excited, MotionTag::Happy],
            Mood::Thinking => &[MotionTag::Thinking],
            Mood::Neutral => &[MotionTag::Idle],
            Mood::Shy => &[MotionTag::Shy],
            Mood::Concerned => &[MotionTag::Concerned, MotionTag::Sad],
            Mood::Dramatic => &[MotionTag::Dramatic, MotionTag::Surprised],
            Mood::Smug => &[MotionTag::Smug, MotionTag::Happy],
            Mood::Sad => &[MotionTag::Sad],
            Mood::Surprised => &[MotionTag::Surprised],
            Mood::Angry => &[MotionTag::Angry],
            Mood::Sleepy => &[MotionTag::Sleepy, MotionTag::Idle],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Layer;
    use marionette_api_core::{ParamDef, ParamTable};

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(Mood::from_label(" Happy "), Some(Mood::Happy));
        assert_eq!(Mood::from_label("SLEEPY"), Some(Mood::Sleepy));
        assert_eq!(Mood::from_label("bored"), None);
        for m in Mood::ALL {
            assert_eq!(Mood::from_label(m.name()), Some(m));
        }
    }

    #[test]
    fn expressions_keep_relative_shape() {
        let happy = Mood::Happy.expression();
        let surprised = Mood::Surprised.expression();
        let neutral = Mood::Neutral.expression();
        assert!(happy.eye_open < neutral.eye_open && happy.brow_y > neutral.brow_y);
        assert!(surprised.eye_open > neutral.eye_open && surprised.brow_y > happy.brow_y);
        for m in [Mood::Sad, Mood::Concerned] {
            let e = m.expression();
            assert!(e.eye_open < neutral.eye_open && e.brow_y < neutral.brow_y);
        }
    }

    #[test]
    fn every_mood_has_tags() {
        assert!(Mood::ALL.iter().all(|m| !m.motion_tags().is_empty()));
    }

    #[test]
    fn apply_counts_accepted_channels() {
        let mut t = ParamTable::new(vec![
            ParamDef::new("PARAM_EYE_L_OPEN", 0.0, 2.0, 1.0),
            ParamDef::new("ParamEyeROpen", 0.0, 2.0, 1.0),
            ParamDef::new("ParamBrowLY", -1.0, 1.0, 0.0),
        ]);
        let written = Mood::Sad
            .expression()
            .apply(&mut ParamWriter::untracked(&mut t, Layer::Mood));
        assert_eq!(written, 3);
        assert_eq!(t.get("PARAM_EYE_L_OPEN"), Some(0.6));
        assert_eq!(t.get("ParamBrowLY"), Some(-0.5));
    }
}
