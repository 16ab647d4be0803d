use approx::assert_abs_diff_eq;
use marionette_animation::{
    Avatar, AvatarError, Channel, Config, HeadlessPuppet, Layer, LipSyncTimeline, ParamDef,
    ParamTable, StopReason,
};
use marionette_test_fixtures::{layouts, timelines};

fn avatar() -> Avatar<HeadlessPuppet> {
    let defs: Vec<ParamDef> = layouts::load("cubism3").expect("cubism3 layout");
    let puppet = HeadlessPuppet::new().with_params(ParamTable::new(defs));
    Avatar::with_seed(puppet, Config::default(), 4).expect("valid config")
}

fn timeline(name: &str) -> LipSyncTimeline {
    let json = timelines::json(name).expect("timeline fixture");
    LipSyncTimeline::from_json(&json).expect("timeline parses")
}

fn mouth(avatar: &Avatar<HeadlessPuppet>) -> f32 {
    avatar.runtime().value(Channel::MouthOpenY).expect("mouth channel")
}

#[test]
fn single_viseme_window() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("single-viseme"), 0.0);

    let f = avatar.tick(50.0);
    assert_eq!(f.writes.last_for(Channel::MouthOpenY), Some(0.0));

    avatar.tick(150.0);
    assert_abs_diff_eq!(mouth(&avatar), 0.6, epsilon = 1e-6);

    avatar.tick(300.0);
    assert_abs_diff_eq!(mouth(&avatar), 0.6, epsilon = 1e-6);

    avatar.tick(400.0);
    assert_eq!(mouth(&avatar), 0.0);
    // the timeline keeps driving the mouth until stopped
    assert!(avatar.clock().is_running(Layer::LipSync));
}

#[test]
fn start_is_anchored_at_first_tick() {
    let mut avatar = avatar();
    avatar.start_lip_sync(timeline("single-viseme"));
    assert_eq!(avatar.lip_sync().elapsed_ms(10_000.0), None);
    avatar.tick(10_000.0);
    assert_eq!(mouth(&avatar), 0.0);
    assert_eq!(avatar.lip_sync().elapsed_ms(10_150.0), Some(150.0));
    avatar.tick(10_150.0);
    assert_abs_diff_eq!(mouth(&avatar), 0.6, epsilon = 1e-6);
}

#[test]
fn stop_lip_sync_closes_mouth_and_holds() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("single-viseme"), 0.0);
    avatar.tick(150.0);
    assert!(mouth(&avatar) > 0.0);

    avatar.stop_lip_sync();
    assert_eq!(mouth(&avatar), 0.0);
    assert!(!avatar.lip_sync().has_timeline());

    let f = avatar.tick(166.0);
    assert_eq!(f.stopped(Layer::LipSync), Some(StopReason::Requested));
    for i in 0..30 {
        let f = avatar.tick(200.0 + i as f64 * 16.0);
        assert!(f.writes.last_for(Channel::MouthOpenY).is_none());
        assert_eq!(mouth(&avatar), 0.0);
    }
}

#[test]
fn new_timeline_replaces_running_one() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("hello"), 0.0);
    avatar.tick(100.0);
    avatar.start_lip_sync_at(timeline("single-viseme"), 100.0);
    let f = avatar.tick(150.0);
    assert_eq!(f.stopped(Layer::LipSync), Some(StopReason::Replaced));
    // 50ms into the new timeline: before its only viseme
    assert_eq!(mouth(&avatar), 0.0);
}

#[test]
fn hello_timeline_stays_in_range() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("hello"), 0.0);
    let mut peak: f32 = 0.0;
    for i in 0..40 {
        avatar.tick(i as f64 * 16.0);
        let m = mouth(&avatar);
        assert!((0.0..=1.0).contains(&m));
        peak = peak.max(m);
    }
    assert_abs_diff_eq!(peak, 0.9, epsilon = 1e-6);
}

#[test]
fn malformed_json_is_rejected_and_current_timeline_kept() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("single-viseme"), 0.0);
    let err = avatar.start_lip_sync_json("{ not json").unwrap_err();
    assert!(matches!(err, AvatarError::Timeline(_)));
    assert!(avatar.lip_sync().has_timeline());
    avatar.tick(150.0);
    assert_abs_diff_eq!(mouth(&avatar), 0.6, epsilon = 1e-6);
}

#[test]
fn oscillator_is_a_bounded_triangle() {
    let mut avatar = avatar();
    avatar.start_speaking();
    let mut values = Vec::new();
    for i in 0..30 {
        avatar.tick(i as f64 * 16.0);
        values.push(mouth(&avatar));
    }
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(values.iter().cloned().fold(0.0, f32::max), 1.0);
    assert_abs_diff_eq!(values[0], 0.15, epsilon = 1e-6);
    assert!(values[7] < values[6]);

    avatar.stop_speaking();
    assert_eq!(mouth(&avatar), 0.0);
    assert!(!avatar.is_active());
}

#[test]
fn oscillator_step_is_configurable() {
    let defs: Vec<ParamDef> = layouts::load("cubism3").expect("cubism3 layout");
    let puppet = HeadlessPuppet::new().with_params(ParamTable::new(defs));
    let cfg = Config::default().with_oscillator_step(0.5);
    let mut avatar = Avatar::with_seed(puppet, cfg, 4).expect("valid config");
    avatar.start_speaking();

    let mut values = Vec::new();
    for i in 0..5 {
        avatar.tick(i as f64 * 16.0);
        values.push(mouth(&avatar));
    }
    assert_eq!(values, vec![0.5, 1.0, 0.5, 0.0, 0.5]);
}

#[test]
fn stop_speaking_without_oscillator_writes_nothing() {
    let mut avatar = avatar();
    avatar.start_lip_sync_at(timeline("single-viseme"), 0.0);
    avatar.tick(150.0);
    avatar.stop_speaking();
    assert_abs_diff_eq!(mouth(&avatar), 0.6, epsilon = 1e-6);
}
