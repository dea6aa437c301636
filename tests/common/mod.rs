#![allow(dead_code)]

use std::path::Path;

/// Mono float WAV holding `value` for `secs` seconds.
pub fn write_const_wav(path: &Path, rate: u32, secs: f64, value: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(f64::from(rate) * secs).round() as u32 {
        w.write_sample(value).unwrap();
    }
    w.finalize().unwrap();
}

/// `count` solid frames named `frame_0001.png`..., red channel stepping by 2.
pub fn write_frames(dir: &Path, count: u32, width: u32, height: u32) {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..count {
        let r = ((i * 2) % 256) as u8;
        image::RgbaImage::from_pixel(width, height, image::Rgba([r, 0, 0, 255]))
            .save(dir.join(format!("frame_{:04}.png", i + 1)))
            .unwrap();
    }
}

pub fn write_solid_png(path: &Path, width: u32, height: u32, px: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(px))
        .save(path)
        .unwrap();
}

/// Three one-second beats at 0, 5 and 10 seconds, 10 fps, each with its own level.
pub fn write_three_beat_project(root: &Path) {
    for (name, level) in [("b1", 0.1f32), ("b2", 0.2), ("b3", 0.3)] {
        write_const_wav(&root.join(format!("{name}.wav")), 8_000, 1.0, level);
    }
    std::fs::write(
        root.join("director.json"),
        r#"{ "fps": 10, "beats": [
            { "id": "b1", "tc_in": "00:00:00.000", "char": "MediatorA", "audio": "b1.wav" },
            { "id": "b2", "tc_in": "00:00:05.000", "char": "Disputant1", "audio": "b2.wav" },
            { "id": "b3", "tc_in": "00:00:10.000", "char": "MediatorA", "audio": "b3.wav" }
        ] }"#,
    )
    .unwrap();
    std::fs::write(
        root.join("characters.json"),
        r#"{ "characters": {
            "MediatorA": { "parts": { "body": "MA_body" } },
            "Disputant1": { "mesh": "Head_D1" } } }"#,
    )
    .unwrap();
    std::fs::write(
        root.join("script.txt"),
        "MEDIATOR A\nWelcome.\n\n[OVERLAY]\n\nDISPUTANT 1\nThank you.\n\n[ProcessFormSwap]\n\nMEDIATOR A\nLet us begin.\n",
    )
    .unwrap();
}
