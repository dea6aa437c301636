use super::*;

fn chars() -> CharacterMap {
    CharacterMap::from_json_str(
        r#"{ "characters": { "A": { "mesh": "Head_A" }, "B": { "parts": { "body": "B_body" } } } }"#,
    )
    .unwrap()
}

fn load(json: &str) -> VisemixResult<Timeline> {
    let doc = DirectorDoc::from_json_str(json)?;
    Timeline::from_document(&doc, Path::new("."), &chars())
}

#[test]
fn total_duration_and_frame_count_follow_last_beat() {
    let tl = load(
        r#"{ "fps": 24, "beats": [
            { "tc_in": "00:00:00.000", "char": "A", "duration": 2.0 },
            { "tc_in": 2.5, "char": "B", "duration": 1.01 },
            { "type": "pause", "tc_in": "00:00:03.510", "duration": 0.5 }
        ] }"#,
    )
    .unwrap();
    assert!((tl.total_duration() - 4.01).abs() < 1e-9);
    assert_eq!(tl.frame_count(), (4.01f64 * 24.0).ceil() as u64);
    assert_eq!(tl.beats()[2].kind, BeatKind::Pause);
    assert_eq!(tl.beats()[0].id, "beat-0");
    assert_eq!(tl.speakers(), vec!["A", "B"]);
}

#[test]
fn non_monotonic_beats_are_an_ordering_error() {
    let err = load(
        r#"{ "fps": 24, "beats": [
            { "tc_in": 3.0, "char": "A", "duration": 1.0 },
            { "tc_in": 1.0, "char": "B", "duration": 1.0 }
        ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, VisemixError::Ordering(_)));
}

#[test]
fn zero_fps_is_degenerate_timing() {
    let err = load(r#"{ "fps": 0, "beats": [] }"#).unwrap_err();
    assert!(matches!(err, VisemixError::TimingDegenerate(_)));
}

#[test]
fn unknown_speaker_and_missing_audio_are_unresolved() {
    let err = load(r#"{ "beats": [ { "tc_in": 0.0, "char": "Z", "duration": 1.0 } ] }"#)
        .unwrap_err();
    assert!(matches!(err, VisemixError::UnresolvedReference(_)));

    let err = load(
        r#"{ "beats": [ { "tc_in": 0.0, "char": "A", "audio": "definitely/missing.wav" } ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, VisemixError::UnresolvedReference(_)));
}

#[test]
fn duration_is_derived_from_wav_clip() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("b1.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(&wav, spec).unwrap();
    for _ in 0..24_000 {
        w.write_sample(0i16).unwrap();
    }
    w.finalize().unwrap();

    let doc = DirectorDoc::from_json_str(
        r#"{ "fps": 24, "beats": [ { "tc_in": 1.0, "char": "A", "audio": "b1.wav" } ] }"#,
    )
    .unwrap();
    let tl = Timeline::from_document(&doc, dir.path(), &chars()).unwrap();
    assert!((tl.beats()[0].duration - 1.5).abs() < 1e-9);
    assert!((tl.total_duration() - 2.5).abs() < 1e-9);
}

#[test]
fn queries_find_containing_beat_and_boundaries() {
    let tl = load(
        r#"{ "beats": [
            { "tc_in": 0.0, "char": "A", "duration": 4.0 },
            { "tc_in": 5.0, "char": "B", "duration": 4.0 }
        ] }"#,
    )
    .unwrap();
    assert_eq!(tl.beat_containing(1.0).unwrap().id, "beat-0");
    assert!(tl.beat_containing(4.5).is_none());
    assert_eq!(tl.beat_containing(5.0).unwrap().id, "beat-1");

    assert_eq!(tl.boundary_near(4.5, Direction::Before), Some(4.0));
    assert_eq!(tl.boundary_near(4.5, Direction::After), Some(5.0));
    assert_eq!(tl.boundary_near(9.5, Direction::After), None);
    assert_eq!(tl.boundary_near(5.0, Direction::Before), Some(5.0));
}

#[test]
fn phonemes_become_absolute_and_legacy_events_are_accepted() {
    let tl = load(
        r#"{ "beats": [ { "tc_in": 2.0, "char": "A", "duration": 2.0,
            "words": [
                { "text": "hi", "start": 0.1, "end": 0.4,
                  "phonemes": [ { "symbol": "HH", "start": 0.1, "end": 0.2 },
                                { "symbol": "AY", "start": 0.2, "end": 0.4 } ] },
                { "text": "yo", "start": 0.5, "end": 0.7 }
            ],
            "visemes": [ { "p": "viseme_O", "t": 3.5 } ] } ] }"#,
    )
    .unwrap();
    let ph: Vec<Phoneme> = tl.beats()[0].absolute_phonemes().collect();
    assert_eq!(ph.len(), 4);
    assert!((ph[0].start - 2.1).abs() < 1e-9);
    assert_eq!(ph[2].symbol, WORD_FALLBACK_PHONEME);
    assert_eq!(ph[3].symbol, "viseme_O");
    assert!((ph[3].start - 3.5).abs() < 1e-9);
    assert_eq!(ph[3].start, ph[3].end);
}
