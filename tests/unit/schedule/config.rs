use super::*;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"png").unwrap();
}

#[test]
fn defaults_apply_to_missing_fields() {
    let cfg = OverlayConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg.duration, 12.0);
    assert_eq!(cfg.fade, 0.5);
    assert_eq!(cfg.overlay_alpha, 0.9);
    assert_eq!(cfg.anchor, AnchorPolicy::PrevEnd);
    assert_eq!(cfg.pre_roll_frames, 2);
    assert_eq!((cfg.pf_width, cfg.pf_dx, cfg.pf_margin, cfg.pf_y), (200, 300, 60, 60));
    assert_eq!(cfg.pf_anim_sec, 0.5);
    assert!(cfg.validate().is_ok());
}

#[test]
fn unknown_fields_are_ignored() {
    let cfg = OverlayConfig::from_json_str(r#"{ "labels": true, "duration": 3.0 }"#).unwrap();
    assert_eq!(cfg.duration, 3.0);
}

#[test]
fn per_id_then_default_then_global() {
    let cfg = OverlayConfig::from_json_str(
        r#"{
            "duration": 10.0, "fade": 0.25,
            "overlays": [
                { "id": 2, "duration": 4.0, "pre_roll_sec": 0.5 },
                { "id": "default", "fade": 1.0, "overlay_alpha": 0.5 }
            ] }"#,
    )
    .unwrap();
    let two = cfg.resolve(Some(2), 24.0);
    assert_eq!(two.duration, 4.0);
    assert_eq!(two.fade, 1.0);
    assert_eq!(two.overlay_alpha, 0.5);
    assert_eq!(two.pre_roll_sec, 0.5);

    let other = cfg.resolve(Some(9), 24.0);
    assert_eq!(other.duration, 10.0);
    assert!((other.pre_roll_sec - 2.0 / 24.0).abs() < 1e-12);

    let none = cfg.resolve(None, 24.0);
    assert_eq!(none.fade, 1.0);
}

#[test]
fn invalid_values_are_rejected() {
    let mut cfg = OverlayConfig::default();
    cfg.duration = 0.0;
    assert!(matches!(cfg.validate(), Err(VisemixError::TimingDegenerate(_))));
    let mut cfg = OverlayConfig::default();
    cfg.overlay_alpha = 1.5;
    assert!(cfg.validate().is_err());
    let mut cfg = OverlayConfig::default();
    cfg.pf_alpha = -0.1;
    assert!(cfg.validate().is_err());
}

#[test]
fn icon_alpha_defaults_to_opaque_and_loads_from_file() {
    assert_eq!(OverlayConfig::default().pf_alpha, 1.0);
    let cfg = OverlayConfig::from_json_str(r#"{ "pf_alpha": 0.4 }"#).unwrap();
    assert_eq!(cfg.pf_alpha, 0.4);
    assert!(cfg.validate().is_ok());
}

#[test]
fn image_resolution_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("slates/global.png"));
    touch(&root.join("slates/Overlay3.png"));
    touch(&root.join("assets/Overlay4.png"));
    touch(&root.join("per_id.png"));
    touch(&root.join("fallback.png"));

    let cfg_path = root.join("overlay.json");
    std::fs::write(
        &cfg_path,
        r#"{
            "overlay_image": "slates/global.png",
            "overlays": [
                { "id": 1, "image": "per_id.png" },
                { "id": 5, "image": "missing.png" }
            ] }"#,
    )
    .unwrap();
    let cfg = OverlayConfig::from_path(&cfg_path).unwrap();
    assert_eq!(cfg.resolve(Some(1), 24.0).image, Some(root.join("per_id.png")));
    assert_eq!(cfg.resolve(Some(3), 24.0).image, Some(root.join("slates/Overlay3.png")));
    assert_eq!(cfg.resolve(Some(4), 24.0).image, Some(root.join("assets/Overlay4.png")));
    assert_eq!(cfg.resolve(Some(5), 24.0).image, Some(root.join("slates/global.png")));
    assert_eq!(cfg.resolve(None, 24.0).image, Some(root.join("slates/global.png")));

    let with_default = OverlayConfig {
        overlays: vec![OverlayEntry {
            id: Some(OverlayKey::Name("default".to_string())),
            image: Some(root.join("fallback.png")),
            ..OverlayEntry::default()
        }],
        ..cfg
    };
    assert_eq!(with_default.resolve(Some(3), 24.0).image, Some(root.join("fallback.png")));
}
