//! Lip-sync: viseme timelines and the fallback mouth oscillator.
//!
//! The two modes are mutually exclusive; the avatar guarantees only one of them holds a clock
//! task at a time. Timeline JSON as delivered by the speech collaborator:
//!
//! ```json
//! { "visemes": [ { "time": 100, "duration": 200, "viseme": "A", "value": 1.0 } ],
//!   "mouthShapes": { "A": { "mouth_open": 0.6 } } }
//! ```
//!
//! Times are milliseconds from the start of the utterance.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use marionette_api_core::Channel;

use crate::error::AvatarError;
use crate::params::ParamWriter;

fn full_intensity() -> f32 {
    1.0
}

/// One viseme occurrence on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    #[serde(rename = "time")]
    pub start_ms: f64,
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    pub viseme: String,
    #[serde(rename = "value", default = "full_intensity")]
    pub intensity: f32,
}

impl VisemeEvent {
    pub fn new(start_ms: f64, duration_ms: f64, viseme: impl Into<String>, intensity: f32) -> Self {
        Self {
            start_ms,
            duration_ms,
            viseme: viseme.into(),
            intensity,
        }
    }

    #[inline]
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Closed window `[start, start + duration]`.
    #[inline]
    pub fn contains(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.start_ms && elapsed_ms <= self.end_ms()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MouthShape {
    pub mouth_open: f32,
}

/// Wire shape; every decode path goes through [`LipSyncTimeline::new`].
#[derive(Deserialize)]
struct RawTimeline {
    visemes: Vec<VisemeEvent>,
    #[serde(rename = "mouthShapes", default)]
    mouth_shapes: HashMap<String, MouthShape>,
}

impl From<RawTimeline> for LipSyncTimeline {
    fn from(raw: RawTimeline) -> Self {
        Self::new(raw.visemes, raw.mouth_shapes)
    }
}

/// Immutable viseme timeline for one utterance. Events are kept ordered by start time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTimeline")]
pub struct LipSyncTimeline {
    visemes: Vec<VisemeEvent>,
    #[serde(rename = "mouthShapes")]
    mouth_shapes: HashMap<String, MouthShape>,
}

impl LipSyncTimeline {
    /// Build a timeline; events are ordered by start time (stable for equal starts).
    pub fn new(mut visemes: Vec<VisemeEvent>, mouth_shapes: HashMap<String, MouthShape>) -> Self {
        visemes.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
        Self {
            visemes,
            mouth_shapes,
        }
    }

    pub fn from_json(s: &str) -> Result<Self, AvatarError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn visemes(&self) -> &[VisemeEvent] {
        &self.visemes
    }

    pub fn mouth_shape(&self, viseme: &str) -> Option<MouthShape> {
        self.mouth_shapes.get(viseme).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.visemes.is_empty()
    }

    /// End of the last viseme window.
    pub fn duration_ms(&self) -> f64 {
        self.visemes
            .iter()
            .map(VisemeEvent::end_ms)
            .fold(0.0, f64::max)
    }

    /// Earliest-starting event whose window contains `elapsed_ms`.
    pub fn event_at(&self, elapsed_ms: f64) -> Option<&VisemeEvent> {
        self.visemes.iter().find(|e| e.contains(elapsed_ms))
    }

    /// Mouth aperture at `elapsed_ms`: `clamp(base * intensity, 0, 1)`, or 0 between visemes
    /// and for visemes without a mouth shape.
    pub fn sample(&self, elapsed_ms: f64) -> f32 {
        let Some(event) = self.event_at(elapsed_ms) else {
            return 0.0;
        };
        let base = self
            .mouth_shape(&event.viseme)
            .map(|s| s.mouth_open)
            .unwrap_or(0.0);
        (base * event.intensity).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug)]
struct ActiveTimeline {
    timeline: LipSyncTimeline,
    /// Wall-clock start; anchored on the first tick when not given explicitly.
    started_at: Option<f64>,
}

/// Bounded triangle wave between 0 and 1.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Oscillator {
    value: f32,
    rising: bool,
}

impl Oscillator {
    fn new() -> Self {
        Self {
            value: 0.0,
            rising: true,
        }
    }

    fn advance(&mut self, step: f32) -> f32 {
        if self.rising {
            self.value += step;
            if self.value >= 1.0 {
                self.value = 1.0;
                self.rising = false;
            }
        } else {
            self.value -= step;
            if self.value <= 0.0 {
                self.value = 0.0;
                self.rising = true;
            }
        }
        self.value
    }
}

#[derive(Clone, Debug)]
pub struct LipSyncPlayer {
    step: f32,
    timeline: Option<ActiveTimeline>,
    oscillator: Option<Oscillator>,
}

impl LipSyncPlayer {
    pub fn new(oscillator_step: f32) -> Self {
        Self {
            step: oscillator_step,
            timeline: None,
            oscillator: None,
        }
    }

    pub fn has_timeline(&self) -> bool {
        self.timeline.is_some()
    }

    pub fn is_oscillating(&self) -> bool {
        self.oscillator.is_some()
    }

    /// Replace the active timeline. Clears the oscillator.
    pub fn load_timeline(&mut self, timeline: LipSyncTimeline, started_at: Option<f64>) {
        self.oscillator = None;
        self.timeline = Some(ActiveTimeline {
            timeline,
            started_at,
        });
    }

    /// Drop the timeline. Returns whether one was loaded.
    pub fn clear_timeline(&mut self) -> bool {
        self.timeline.take().is_some()
    }

    /// Start the fallback oscillator from a closed mouth. Clears any timeline.
    pub fn start_oscillator(&mut self) {
        self.timeline = None;
        self.oscillator = Some(Oscillator::new());
    }

    /// Returns whether the oscillator was running.
    pub fn stop_oscillator(&mut self) -> bool {
        self.oscillator.take().is_some()
    }

    /// Milliseconds since the active timeline started.
    pub fn elapsed_ms(&self, now_ms: f64) -> Option<f64> {
        let active = self.timeline.as_ref()?;
        active.started_at.map(|s| now_ms - s)
    }

    /// Sample the timeline at `now_ms` and write the mouth. Returns the aperture written.
    pub fn tick_timeline(&mut self, now_ms: f64, out: &mut ParamWriter<'_>) -> Option<f32> {
        let active = self.timeline.as_mut()?;
        let start = *active.started_at.get_or_insert(now_ms);
        let aperture = active.timeline.sample(now_ms - start);
        out.write(Channel::MouthOpenY, aperture);
        Some(aperture)
    }

    /// Advance the oscillator one step and write the mouth.
    pub fn tick_oscillator(&mut self, out: &mut ParamWriter<'_>) -> Option<f32> {
        let osc = self.oscillator.as_mut()?;
        let aperture = osc.advance(self.step);
        out.write(Channel::MouthOpenY, aperture);
        Some(aperture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_format_with_default_intensity() {
        let tl = LipSyncTimeline::from_json(
            r#"{"visemes":[{"time":0,"duration":80,"viseme":"O"}],"mouthShapes":{"O":{"mouth_open":0.8}}}"#,
        )
        .expect("parse");
        assert_eq!(tl.visemes()[0].intensity, 1.0);
        assert_eq!(tl.sample(40.0), 0.8);
    }

    #[test]
    fn missing_mouth_shapes_close_the_mouth() {
        let tl = LipSyncTimeline::from_json(r#"{"visemes":[{"time":0,"duration":80,"viseme":"X","value":1}]}"#)
            .expect("parse");
        assert_eq!(tl.sample(10.0), 0.0);
    }

    #[test]
    fn malformed_json_is_a_timeline_error() {
        let err = LipSyncTimeline::from_json("{\"visemes\": 3}").unwrap_err();
        assert!(matches!(err, AvatarError::Timeline(_)));
    }

    #[test]
    fn aperture_is_clamped() {
        let mut shapes = HashMap::new();
        shapes.insert("A".to_string(), MouthShape { mouth_open: 0.9 });
        let tl = LipSyncTimeline::new(vec![VisemeEvent::new(0.0, 100.0, "A", 2.0)], shapes);
        assert_eq!(tl.sample(50.0), 1.0);
    }

    #[test]
    fn first_matching_event_wins_on_overlap() {
        let mut shapes = HashMap::new();
        shapes.insert("A".to_string(), MouthShape { mouth_open: 0.4 });
        shapes.insert("E".to_string(), MouthShape { mouth_open: 0.2 });
        let tl = LipSyncTimeline::new(
            vec![
                VisemeEvent::new(0.0, 100.0, "A", 1.0),
                VisemeEvent::new(50.0, 100.0, "E", 1.0),
            ],
            shapes,
        );
        assert_eq!(tl.sample(75.0), 0.4);
        assert_eq!(tl.sample(120.0), 0.2);
        assert_eq!(tl.duration_ms(), 150.0);
    }

    #[test]
    fn events_are_sorted_on_construction() {
        let tl = LipSyncTimeline::from_json(
            r#"{"visemes":[{"time":300,"duration":50,"viseme":"B"},{"time":0,"duration":50,"viseme":"A"}]}"#,
        )
        .expect("parse");
        assert_eq!(tl.visemes()[0].viseme, "A");
        assert_eq!(tl.duration_ms(), 350.0);
    }

    #[test]
    fn embedded_timeline_decodes_in_start_order() {
        let json = r#"{"visemes":[{"time":50,"duration":100,"viseme":"E"},{"time":0,"duration":100,"viseme":"A"}],"mouthShapes":{"A":{"mouth_open":0.4},"E":{"mouth_open":0.2}}}"#;
        let direct = LipSyncTimeline::from_json(json).expect("parse");

        #[derive(Deserialize)]
        struct Utterance {
            text: String,
            timeline: LipSyncTimeline,
        }
        let wrapped = format!(r#"{{"text":"ae","timeline":{json}}}"#);
        let embedded: Utterance = serde_json::from_str(&wrapped).expect("parse");

        assert_eq!(embedded.text, "ae");
        assert_eq!(embedded.timeline, direct);
        assert_eq!(direct.sample(75.0), 0.4);
        assert_eq!(embedded.timeline.sample(75.0), 0.4);
    }

    #[test]
    fn serialized_timeline_keeps_wire_names() {
        let tl = LipSyncTimeline::from_json(
            r#"{"visemes":[{"time":0,"duration":80,"viseme":"O","value":0.5}],"mouthShapes":{"O":{"mouth_open":0.8}}}"#,
        )
        .expect("parse");
        let v = serde_json::to_value(&tl).expect("serialize");
        assert_eq!(v["visemes"][0]["time"], 0.0);
        assert!(v["mouthShapes"]["O"].is_object());
        let back: LipSyncTimeline = serde_json::from_value(v).expect("decode");
        assert_eq!(back, tl);
    }

    #[test]
    fn oscillator_is_a_bounded_triangle() {
        let mut osc = Oscillator::new();
        let mut seen = Vec::new();
        for _ in 0..20 {
            seen.push(osc.advance(0.15));
        }
        assert!(seen.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(seen[6], 1.0);
        assert!(seen[7] < 1.0);
        assert_eq!(seen[13], 0.0);
        assert!(seen[14] > 0.0);
    }

    #[test]
    fn modes_exclude_each_other() {
        let mut p = LipSyncPlayer::new(0.15);
        p.start_oscillator();
        p.load_timeline(LipSyncTimeline::default(), Some(0.0));
        assert!(!p.is_oscillating());
        p.start_oscillator();
        assert!(!p.has_timeline());
    }
}
