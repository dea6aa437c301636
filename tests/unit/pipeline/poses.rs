use super::*;

fn write_fixture(dir: &Path) {
    std::fs::write(
        dir.join("director.json"),
        r#"{ "fps": 24, "timing": { "smooth_factor": 0.2 }, "beats": [
            { "tc_in": 0.0, "char": "A", "duration": 1.0,
              "words": [ { "text": "ma", "start": 0.1, "end": 0.5,
                           "phonemes": [ { "symbol": "M", "start": 0.1, "end": 0.2 },
                                         { "symbol": "AA1", "start": 0.2, "end": 0.5 } ] } ] },
            { "type": "pause", "tc_in": 1.0, "duration": 0.5 }
        ] }"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("characters.json"),
        r#"{ "characters": { "A": { "mesh": "Head_A" }, "B": { "parts": { "body": "B_body" } } } }"#,
    )
    .unwrap();
}

#[test]
fn overrides_replace_only_what_is_set() {
    let base = TimingConfig::default();
    let t = TimingOverrides {
        lead_frames: Some(0),
        no_blink: true,
        ..TimingOverrides::default()
    }
    .apply(&base)
    .unwrap();
    assert_eq!(t.lead_frames, 0);
    assert!(!t.blink.enabled);
    assert_eq!(t.time_offset_sec, base.time_offset_sec);
    assert_eq!(t.smooth_factor, base.smooth_factor);

    assert!(
        TimingOverrides {
            smooth_factor: Some(1.5),
            ..TimingOverrides::default()
        }
        .apply(&base)
        .is_err()
    );
}

#[test]
fn validate_reports_beats_and_frames() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let r = validate(&dir.path().join("director.json"), &dir.path().join("characters.json")).unwrap();
    assert_eq!(r.speech_beats, 1);
    assert_eq!(r.pause_beats, 1);
    assert_eq!(r.speakers, vec!["A".to_string()]);
    assert_eq!(r.characters, 2);
    assert!((r.duration - 1.5).abs() < 1e-9);
    assert_eq!(r.frame_count, 36);
}

#[test]
fn validate_fails_on_unmapped_speaker() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("characters.json"),
        r#"{ "characters": { "B": { "mesh": "Head_B" } } }"#,
    )
    .unwrap();
    let err = validate(&dir.path().join("director.json"), &dir.path().join("characters.json"))
        .unwrap_err();
    assert!(matches!(err, VisemixError::UnresolvedReference(_)));
}

#[test]
fn export_writes_every_character_for_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join("out/poses.json");
    let export = export_poses(
        &dir.path().join("director.json"),
        &dir.path().join("characters.json"),
        &TimingOverrides {
            no_blink: true,
            ..TimingOverrides::default()
        },
        &RenderOverrides::default(),
        &out,
    )
    .unwrap();

    assert!(out.is_file());
    assert_eq!(export.render.engine, "BLENDER_EEVEE");
    assert_eq!(export.frame_count, 36);
    assert_eq!(export.characters.len(), 2);
    for poses in export.characters.values() {
        assert_eq!(poses.frames.len(), 36);
        for frame in &poses.frames {
            assert!(frame.values().all(|w| (0.0..=1.0).contains(w)));
        }
    }
    let a = &export.characters["A"];
    assert!(a.frames.iter().any(|f| f.get("viseme_aa").copied().unwrap_or(0.0) > 0.0));
}

#[test]
fn render_overrides_reach_the_export() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join("poses.json");
    let render = RenderOverrides {
        resolution: Some([1280, 720]),
        engine: Some("CYCLES".to_string()),
        quality: Some("preview".to_string()),
    };
    let export = export_poses(
        &dir.path().join("director.json"),
        &dir.path().join("characters.json"),
        &TimingOverrides::default(),
        &render,
        &out,
    )
    .unwrap();
    assert_eq!(export.render.resolution, [1280, 720]);
    assert_eq!(export.render.engine, "CYCLES");
    assert_eq!(export.render.quality.as_deref(), Some("preview"));
    assert!(export.render.transparent);

    let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["render"]["engine"], "CYCLES");
    assert_eq!(v["render"]["resolution"][0], 1280);
}

#[test]
fn render_overrides_reject_degenerate_values() {
    let base = RenderConfig::default();
    assert_eq!(RenderOverrides::default().apply(&base).unwrap(), base);
    assert!(
        RenderOverrides {
            resolution: Some([0, 720]),
            ..RenderOverrides::default()
        }
        .apply(&base)
        .is_err()
    );
    assert!(
        RenderOverrides {
            engine: Some("  ".to_string()),
            ..RenderOverrides::default()
        }
        .apply(&base)
        .is_err()
    );
}
