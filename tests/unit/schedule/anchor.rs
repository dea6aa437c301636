use super::*;
use crate::foundation::core::Fps;
use crate::script::markers::MarkerKind;
use crate::timeline::model::Beat;

fn beat(id: &str, kind: BeatKind, tc_in: f64, duration: f64) -> Beat {
    Beat {
        id: id.to_string(),
        kind,
        speaker: (kind == BeatKind::Speech).then(|| "A".to_string()),
        words: Vec::new(),
        audio: None,
        tc_in,
        duration,
    }
}

fn timeline() -> Timeline {
    Timeline::from_beats(
        Fps::from_int(24).unwrap(),
        vec![
            beat("b0", BeatKind::Speech, 0.0, 4.0),
            beat("p1", BeatKind::Pause, 4.0, 1.0),
            beat("b2", BeatKind::Speech, 5.5, 2.5),
            beat("b3", BeatKind::Speech, 8.0, 2.0),
        ],
    )
    .unwrap()
}

const SCRIPT: &str = "\
A
first line

[PAUSE]

A
second line

[OVERLAY2]

A
third line
";

#[test]
fn prev_end_uses_end_of_preceding_beat() {
    let scan = ScriptScan::parse(SCRIPT).unwrap();
    let anchored = anchor_markers(&scan, &timeline(), AnchorPolicy::PrevEnd).unwrap();
    assert_eq!(anchored.len(), 1);
    assert_eq!(anchored[0].beat_index, 2);
    assert_eq!(anchored[0].anchor_time, 8.0);
    assert_eq!(anchored[0].marker.kind, MarkerKind::Overlay { id: Some(2) });
}

#[test]
fn next_start_uses_start_of_following_beat() {
    let scan = ScriptScan::parse(SCRIPT).unwrap();
    let anchored = anchor_markers(&scan, &timeline(), AnchorPolicy::NextStart).unwrap();
    assert_eq!(anchored[0].beat_index, 3);
    assert_eq!(anchored[0].anchor_time, 8.0);
}

#[test]
fn line_tokens_skip_unmatched_pause_beats() {
    let scan = ScriptScan::parse("A\nfirst\n\nA\nsecond\n\n[ProcessFormSwap]\n").unwrap();
    let anchored = anchor_markers(&scan, &timeline(), AnchorPolicy::PrevEnd).unwrap();
    // The second line skips the pause beat and consumes b2.
    assert_eq!(anchored[0].beat_index, 2);
    assert_eq!(anchored[0].anchor_time, 8.0);
}

#[test]
fn marker_before_first_beat_fails_for_prev_end() {
    let scan = ScriptScan::parse("[OVERLAY]\nA\nline\n").unwrap();
    let err = anchor_markers(&scan, &timeline(), AnchorPolicy::PrevEnd).unwrap_err();
    assert!(matches!(err, VisemixError::MarkerResolution(_)));
    let ok = anchor_markers(&scan, &timeline(), AnchorPolicy::NextStart).unwrap();
    assert_eq!(ok[0].anchor_time, 0.0);
}

#[test]
fn marker_after_last_beat_fails_for_next_start() {
    let script = "A\na\n\n[PAUSE]\n\nA\nb\n\nA\nc\n\n[OVERLAY]\n";
    let scan = ScriptScan::parse(script).unwrap();
    let err = anchor_markers(&scan, &timeline(), AnchorPolicy::NextStart).unwrap_err();
    assert!(matches!(err, VisemixError::MarkerResolution(_)));
    let ok = anchor_markers(&scan, &timeline(), AnchorPolicy::PrevEnd).unwrap();
    assert_eq!(ok[0].anchor_time, 10.0);
}
