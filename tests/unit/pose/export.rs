use super::*;
use crate::foundation::core::Fps;
use crate::timeline::characters::CharacterMap;
use crate::timeline::model::{Beat, BeatKind, Phoneme, Timeline, Word};
use crate::viseme::table::VisemeTable;

fn synth() -> PoseSynthesizer {
    let chars = CharacterMap::from_json_str(
        r#"{ "characters": { "A": { "parts": { "body": "A_body", "eyes": "A_eyes" } } } }"#,
    )
    .unwrap();
    let beat = Beat {
        id: "b1".to_string(),
        kind: BeatKind::Speech,
        speaker: Some("A".to_string()),
        words: vec![Word {
            text: "ma".to_string(),
            start: 0.1,
            end: 0.5,
            phonemes: vec![
                Phoneme {
                    symbol: "M".to_string(),
                    start: 0.1,
                    end: 0.2,
                },
                Phoneme {
                    symbol: "AA".to_string(),
                    start: 0.2,
                    end: 0.5,
                },
            ],
        }],
        audio: None,
        tc_in: 0.0,
        duration: 1.0,
    };
    let timeline = Timeline::from_beats(Fps::from_int(24).unwrap(), vec![beat]).unwrap();
    PoseSynthesizer::new(&timeline, &chars, &VisemeTable::default()).unwrap()
}

#[test]
fn export_has_one_frame_map_per_output_frame() {
    let export = PoseExport::from_synthesizer(&synth(), &RenderConfig::default()).unwrap();
    assert_eq!(export.frame_count, 24);
    assert_eq!(export.fps, 24.0);
    assert_eq!(export.render.resolution, [1920, 1080]);
    let a = &export.characters["A"];
    assert_eq!(a.frames.len(), 24);
    assert!(matches!(a.target, CharacterTarget::PartBased { .. }));
    assert!(a.frames[0].contains_key("viseme_aa"));
    assert!(a.frames[0].contains_key("eyeBlinkLeft"));
}

#[test]
fn export_round_trips_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("poses.json");
    let render = RenderConfig {
        resolution: [1280, 720],
        quality: Some("preview".to_string()),
        ..RenderConfig::default()
    };
    let export = PoseExport::from_synthesizer(&synth(), &render).unwrap();
    export.write_json(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let back: PoseExport = serde_json::from_str(&text).unwrap();
    assert_eq!(back.frame_count, export.frame_count);
    assert_eq!(back.render, render);
    assert_eq!(back.characters["A"].target, export.characters["A"].target);
    assert_eq!(back.characters["A"].frames.len(), 24);
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["characters"]["A"]["target"]["kind"], "part_based");
}
