use super::*;
use crate::timeline::model::{Beat, BeatKind, Word};

fn fps24() -> Fps {
    Fps::from_int(24).unwrap()
}

fn ph(symbol: &str, start: f64, end: f64) -> Phoneme {
    Phoneme {
        symbol: symbol.to_string(),
        start,
        end,
    }
}

fn beat(speaker: &str, tc_in: f64, phonemes: Vec<Phoneme>) -> Beat {
    let start = phonemes.first().map_or(0.0, |p| p.start);
    let end = phonemes.last().map_or(0.0, |p| p.end);
    Beat {
        id: format!("{speaker}-{tc_in}"),
        kind: BeatKind::Speech,
        speaker: Some(speaker.to_string()),
        words: vec![Word {
            text: "w".to_string(),
            start,
            end,
            phonemes,
        }],
        audio: None,
        tc_in,
        duration: 2.0,
    }
}

fn chars() -> CharacterMap {
    CharacterMap::from_json_str(
        r#"{ "characters": {
            "A": { "mesh": "Head_A" },
            "B": { "parts": { "body": "B_body" }, "profile": { "peak": 0.8 } } } }"#,
    )
    .unwrap()
}

#[test]
fn zero_length_phoneme_is_widened_to_one_frame() {
    let act = activation(&ph("AA", 1.0, 1.0), 1.0, 0.25, fps24());
    let frame = 1.0 / 24.0;
    assert!((act[0].time - (1.0 - frame)).abs() < 1e-12);
    assert!((act[3].time - (1.0 + frame)).abs() < 1e-12);
    assert_eq!(act[1].weight, 1.0);
}

#[test]
fn long_phoneme_ramp_scales_with_duration() {
    let act = activation(&ph("AA", 0.0, 1.0), 1.0, 0.25, fps24());
    assert!((act[0].time + 0.25).abs() < 1e-12);
    assert!((act[3].time - 1.25).abs() < 1e-12);
}

#[test]
fn overlapping_activations_merge_by_maximum() {
    let fps = fps24();
    let a = activation(&ph("AA", 0.0, 0.4), 1.0, 0.25, fps);
    let b = activation(&ph("AA", 0.3, 0.8), 1.0, 0.25, fps);
    let merged = max_merge(&a, &b);
    for i in 0..=200 {
        let t = -0.2 + f64::from(i) * 0.006;
        let want = eval(&a, t).max(eval(&b, t));
        let got = eval(&merged, t);
        assert!((want - got).abs() < 1e-9, "t={t} want={want} got={got}");
        assert!(got <= 1.0);
    }
}

#[test]
fn crossing_point_is_inserted() {
    let a = [
        Breakpoint { time: 0.0, weight: 1.0 },
        Breakpoint { time: 1.0, weight: 0.0 },
    ];
    let b = [
        Breakpoint { time: 0.0, weight: 0.0 },
        Breakpoint { time: 1.0, weight: 1.0 },
    ];
    let merged = max_merge(&a, &b);
    assert_eq!(merged.len(), 3);
    assert!((merged[1].time - 0.5).abs() < 1e-12);
    assert!((merged[1].weight - 0.5).abs() < 1e-12);
}

#[test]
fn curves_stay_in_unit_range_and_decay_in_gaps() {
    let fps = fps24();
    let timeline = Timeline::from_beats(
        fps,
        vec![
            beat(
                "A",
                0.0,
                vec![ph("AA", 0.1, 0.3), ph("AE", 0.25, 0.5), ph("M", 0.5, 0.55)],
            ),
            beat("A", 3.0, vec![ph("IY1", 0.0, 0.2)]),
        ],
    )
    .unwrap();
    let curves = build_curves(&timeline, &chars(), &VisemeTable::default()).unwrap();
    assert_eq!(curves.len(), 1);
    let a = &curves[0];
    assert!(a.curves.contains_key("viseme_aa"));
    assert!(a.curves.contains_key("viseme_PP"));
    assert!(a.curves.contains_key("viseme_I"));

    for i in 0..=(4 * 24) {
        let t = f64::from(i) / 24.0;
        for c in a.curves.values() {
            let w = c.weight_at(t);
            assert!((0.0..=1.0).contains(&w));
        }
    }
    // Overlap of two /aa/ phonemes holds the plateau instead of summing.
    assert!((a.weight_at("viseme_aa", 0.28) - 1.0).abs() < 1e-9);
    // Silence between the beats.
    assert_eq!(a.weight_at("viseme_aa", 2.0), 0.0);
    assert_eq!(a.weight_at("viseme_O", 0.2), 0.0);
    // Second beat is placed at its tc_in.
    assert!((a.weight_at("viseme_I", 3.1) - 1.0).abs() < 1e-9);
}

#[test]
fn profile_peak_scales_weights() {
    let timeline =
        Timeline::from_beats(fps24(), vec![beat("B", 0.0, vec![ph("AA", 0.0, 0.5)])]).unwrap();
    let curves = build_curves(&timeline, &chars(), &VisemeTable::default()).unwrap();
    assert!((curves[0].weight_at("viseme_aa", 0.25) - 0.8).abs() < 1e-9);
}

#[test]
fn unmapped_speaker_is_an_error() {
    let timeline =
        Timeline::from_beats(fps24(), vec![beat("Ghost", 0.0, vec![ph("AA", 0.0, 0.5)])]).unwrap();
    let err = build_curves(&timeline, &chars(), &VisemeTable::default()).unwrap_err();
    assert!(matches!(err, VisemixError::UnresolvedReference(_)));
}

#[test]
fn profile_validation_rejects_bad_values() {
    assert!(WeightsProfile::default().validate("A").is_ok());
    let bad_peak = WeightsProfile {
        peak: 1.5,
        ramp_fraction: None,
    };
    assert!(bad_peak.validate("A").is_err());
    let bad_ramp = WeightsProfile {
        peak: 1.0,
        ramp_fraction: Some(0.0),
    };
    assert!(bad_ramp.validate("A").is_err());
}
