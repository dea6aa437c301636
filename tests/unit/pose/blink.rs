use super::*;

fn cfg() -> BlinkConfig {
    BlinkConfig::default()
}

#[test]
fn schedule_is_deterministic_per_character() {
    let fps = Fps::from_int(24).unwrap();
    let a1 = BlinkTrack::schedule("MediatorA", &cfg(), fps, 60.0).unwrap();
    let a2 = BlinkTrack::schedule("MediatorA", &cfg(), fps, 60.0).unwrap();
    let b = BlinkTrack::schedule("Disputant1", &cfg(), fps, 60.0).unwrap();
    assert_eq!(a1, a2);
    assert_ne!(a1.centers(), b.centers());
}

#[test]
fn intervals_respect_bounds() {
    let fps = Fps::from_int(24).unwrap();
    let track = BlinkTrack::schedule("A", &cfg(), fps, 120.0).unwrap();
    let c = track.centers();
    assert!(!c.is_empty());
    assert!(c[0] >= 3 * 24 && c[0] <= 6 * 24);
    for w in c.windows(2) {
        let gap = w[1] - w[0];
        assert!((3 * 24 - 1..=6 * 24 + 1).contains(&gap), "gap {gap}");
    }
    assert!(*c.last().unwrap() <= (120 - 3) * 24);
}

#[test]
fn short_timelines_have_no_blinks() {
    let fps = Fps::from_int(24).unwrap();
    let track = BlinkTrack::schedule("A", &cfg(), fps, 3.0).unwrap();
    assert!(track.centers().is_empty());
    assert_eq!(track.weight(10), 0.0);
}

#[test]
fn weight_is_a_symmetric_triangle() {
    let track = BlinkTrack {
        centers: vec![100],
        half_frames: 2,
    };
    assert_eq!(track.weight(98), 0.0);
    assert_eq!(track.weight(99), 0.5);
    assert_eq!(track.weight(100), 1.0);
    assert_eq!(track.weight(101), 0.5);
    assert_eq!(track.weight(102), 0.0);
    assert_eq!(track.weight(0), 0.0);
}

#[test]
fn bad_intervals_are_rejected() {
    let fps = Fps::from_int(24).unwrap();
    let mut c = cfg();
    c.min_interval_sec = 0.0;
    assert!(BlinkTrack::schedule("A", &c, fps, 10.0).is_err());
    let mut c = cfg();
    c.max_interval_sec = 1.0;
    assert!(BlinkTrack::schedule("A", &c, fps, 10.0).is_err());
}
