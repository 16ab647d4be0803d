//! Motion catalog and clip selection.
//!
//! Clips are tagged once, when the catalog is built after model load: each [`MotionTag`] has a
//! keyword list matched against the clip's group and file name. From then on selection works on
//! tags only. Assets may also ship explicit tags, which are kept.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mood::Mood;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionTag {
    Idle,
    Greeting,
    Happy,
    Excited,
    Thinking,
    Shy,
    Concerned,
    Dramatic,
    Smug,
    Sad,
    Surprised,
    Angry,
    Sleepy,
    Tap,
}

impl MotionTag {
    pub const ALL: [MotionTag; 14] = [
        MotionTag::Idle,
        MotionTag::Greeting,
        MotionTag::Happy,
        MotionTag::Excited,
        MotionTag::Thinking,
        MotionTag::Shy,
        MotionTag::Concerned,
        MotionTag::Dramatic,
        MotionTag::Smug,
        MotionTag::Sad,
        MotionTag::Surprised,
        MotionTag::Angry,
        MotionTag::Sleepy,
        MotionTag::Tap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MotionTag::Idle => "idle",
            MotionTag::Greeting => "greeting",
            MotionTag::Happy => "happy",
            MotionTag::Excited => "excited",
            MotionTag::Thinking => "thinking",
            MotionTag::Shy => "shy",
            MotionTag::Concerned => "concerned",
            MotionTag::Dramatic => "dramatic",
            MotionTag::Smug => "smug",
            MotionTag::Sad => "sad",
            MotionTag::Surprised => "surprised",
            MotionTag::Angry => "angry",
            MotionTag::Sleepy => "sleepy",
            MotionTag::Tap => "tap",
        }
    }

    /// Lowercase fragments that mark a clip with this tag.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            MotionTag::Idle => &["idle", "wait", "loop"],
            MotionTag::Greeting => &["greet", "hello", "wave"],
            MotionTag::Happy => &["happy", "smile", "joy", "laugh"],
            MotionTag::Excited => &["excite", "jump", "cheer"],
            MotionTag::Thinking => &["think", "ponder", "hmm"],
            MotionTag::Shy => &["shy", "blush", "embarrass"],
            MotionTag::Concerned => &["concern", "worr", "nervous"],
            MotionTag::Dramatic => &["dramatic", "pose", "flick"],
            MotionTag::Smug => &["smug", "proud", "confident"],
            MotionTag::Sad => &["sad", "cry", "sigh"],
            MotionTag::Surprised => &["surprise", "shock", "startle"],
            MotionTag::Angry => &["angry", "mad", "pout"],
            MotionTag::Sleepy => &["sleep", "yawn", "tired"],
            MotionTag::Tap => &["tap", "touch", "poke"],
        }
    }

    pub fn from_name(name: &str) -> Option<MotionTag> {
        let name = name.trim();
        MotionTag::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Tags whose keywords occur in `text` (matched lowercase).
    pub fn resolve(text: &str) -> Vec<MotionTag> {
        let lower = text.to_ascii_lowercase();
        MotionTag::ALL
            .into_iter()
            .filter(|t| t.keywords().iter().any(|k| lower.contains(k)))
            .collect()
    }
}

impl fmt::Display for MotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One motion clip bundled with the puppet asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionClip {
    pub group: String,
    /// Index within the group, as the runtime addresses it.
    pub index: usize,
    pub file: String,
    #[serde(default)]
    pub tags: Vec<MotionTag>,
}

impl MotionClip {
    pub fn new(group: impl Into<String>, index: usize, file: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            index,
            file: file.into(),
            tags: Vec::new(),
        }
    }

    /// File name without directories or extensions (`motions/Happy_01.motion3.json` → `Happy_01`).
    pub fn stem(&self) -> &str {
        let base = self.file.rsplit(['/', '\\']).next().unwrap_or(&self.file);
        base.split('.').next().unwrap_or(base)
    }

    pub fn has_tag(&self, tag: MotionTag) -> bool {
        self.tags.contains(&tag)
    }
}

impl fmt::Display for MotionClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}", self.group, self.index, self.file)
    }
}

/// Read-only set of clips discovered after model load.
#[derive(Clone, Debug, Default)]
pub struct MotionCatalog {
    clips: Vec<MotionClip>,
}

impl MotionCatalog {
    /// Build the catalog, resolving tags from group and file names.
    pub fn new(clips: Vec<MotionClip>) -> Self {
        let clips = clips
            .into_iter()
            .map(|mut clip| {
                let text = format!("{} {}", clip.group, clip.file);
                for tag in MotionTag::resolve(&text) {
                    if !clip.tags.contains(&tag) {
                        clip.tags.push(tag);
                    }
                }
                clip.tags.sort();
                clip
            })
            .collect();
        Self { clips }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clips(&self) -> &[MotionClip] {
        &self.clips
    }

    pub fn with_tag(&self, tag: MotionTag) -> Vec<&MotionClip> {
        self.clips.iter().filter(|c| c.has_tag(tag)).collect()
    }

    pub fn in_group(&self, group: &str) -> Vec<&MotionClip> {
        self.clips
            .iter()
            .filter(|c| c.group.eq_ignore_ascii_case(group))
            .collect()
    }

    /// Clips carrying any of the mood's tags.
    pub fn candidates_for(&self, mood: Mood) -> Vec<&MotionClip> {
        let tags = mood.motion_tags();
        self.clips
            .iter()
            .filter(|c| tags.iter().any(|t| c.has_tag(*t)))
            .collect()
    }

    /// Uniform pick among the mood's candidates, or among the whole catalog when the mood has
    /// none. `None` only for an empty catalog.
    pub fn select_for_mood<R: Rng + ?Sized>(&self, mood: Mood, rng: &mut R) -> Option<&MotionClip> {
        let candidates = self.candidates_for(mood);
        if candidates.is_empty() {
            self.clips.choose(rng)
        } else {
            candidates.choose(rng).copied()
        }
    }

    /// Clips answering to `name`: exact file or stem first, then group, then tag alias.
    pub fn lookup(&self, name: &str) -> Vec<&MotionClip> {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        let by_file: Vec<&MotionClip> = self
            .clips
            .iter()
            .filter(|c| c.file.eq_ignore_ascii_case(name) || c.stem().eq_ignore_ascii_case(name))
            .collect();
        if !by_file.is_empty() {
            return by_file;
        }
        let by_group = self.in_group(name);
        if !by_group.is_empty() {
            return by_group;
        }
        MotionTag::from_name(name)
            .map(|tag| self.with_tag(tag))
            .unwrap_or_default()
    }

    /// Uniform pick among [`MotionCatalog::lookup`] results.
    pub fn select_by_name<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Option<&MotionClip> {
        self.lookup(name).choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> MotionCatalog {
        MotionCatalog::new(vec![
            MotionClip::new("Idle", 0, "motions/idle_01.motion3.json"),
            MotionClip::new("Idle", 1, "motions/idle_02.motion3.json"),
            MotionClip::new("TapBody", 0, "motions/Smile_Wave.motion3.json"),
            MotionClip::new("TapBody", 1, "motions/flick_head.motion3.json"),
        ])
    }

    #[test]
    fn tags_resolve_from_group_and_file() {
        let c = catalog();
        let wave = &c.clips()[2];
        assert!(wave.has_tag(MotionTag::Happy));
        assert!(wave.has_tag(MotionTag::Greeting));
        assert!(wave.has_tag(MotionTag::Tap));
        assert!(c.clips()[0].has_tag(MotionTag::Idle));
        assert!(c.clips()[3].has_tag(MotionTag::Dramatic));
    }

    #[test]
    fn explicit_tags_are_kept() {
        let mut clip = MotionClip::new("Special", 0, "m01.motion3.json");
        clip.tags.push(MotionTag::Sleepy);
        let c = MotionCatalog::new(vec![clip]);
        assert_eq!(c.with_tag(MotionTag::Sleepy).len(), 1);
    }

    #[test]
    fn stem_strips_dirs_and_extensions() {
        let clip = MotionClip::new("g", 0, "a\\b/Happy_01.motion3.json");
        assert_eq!(clip.stem(), "Happy_01");
    }

    #[test]
    fn mood_selection_falls_back_to_whole_catalog() {
        let c = catalog();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let clip = c.select_for_mood(Mood::Angry, &mut rng).expect("clip");
            assert!(c.clips().contains(clip));
        }
    }

    #[test]
    fn mood_selection_stays_in_candidates() {
        let c = catalog();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let clip = c.select_for_mood(Mood::Happy, &mut rng).expect("clip");
            assert_eq!(clip.file, "motions/Smile_Wave.motion3.json");
        }
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        let c = MotionCatalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(c.select_for_mood(Mood::Happy, &mut rng).is_none());
    }

    #[test]
    fn lookup_precedence() {
        let c = catalog();
        assert_eq!(c.lookup("idle_02").len(), 1);
        assert_eq!(c.lookup("motions/idle_01.motion3.json").len(), 1);
        assert_eq!(c.lookup("tapbody").len(), 2);
        assert_eq!(c.lookup("dramatic").len(), 1);
        assert!(c.lookup("nope").is_empty());
        assert!(c.lookup("  ").is_empty());
    }
}
