use super::*;

#[test]
fn over_opaque_replaces_and_transparent_keeps() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [200, 100, 50, 255], 1.0), [200, 100, 50, 255]);
    assert_eq!(over(dst, [200, 100, 50, 0], 1.0), dst);
    assert_eq!(over(dst, [200, 100, 50, 255], 0.0), dst);
}

#[test]
fn over_half_opacity_blends() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert_eq!(out[3], 255);
    assert!((127..=129).contains(&out[0]));
}

#[test]
fn premultiply_matches_rounded_product() {
    let mut px = vec![100u8, 50, 200, 128, 9, 9, 9, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        px,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128,
            0,
            0,
            0,
            0
        ]
    );
}

#[test]
fn draw_over_clips_to_bounds() {
    let mut dst = Frame::filled(4, 4, [0, 0, 0, 255]);
    let src = Frame::filled(2, 2, [255, 0, 0, 255]);
    dst.draw_over(&src, 3, -1, 1.0);
    assert_eq!(dst.pixel(3, 0), [255, 0, 0, 255]);
    assert_eq!(dst.pixel(3, 1), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(2, 0), [0, 0, 0, 255]);
    dst.draw_over(&src, 10, 10, 1.0);
    dst.draw_over(&src, -5, 0, 1.0);
}

#[test]
fn flatten_over_black_produces_expected_rgb() {
    let src = vec![64u8, 32, 16, 128];
    let mut dst = vec![0u8; 4];
    flatten_to_opaque_rgba8(&mut dst, &src, [0, 0, 0]).unwrap();
    assert_eq!(dst, vec![64, 32, 16, 255]);
    assert!(flatten_to_opaque_rgba8(&mut [0u8; 8], &src, [0, 0, 0]).is_err());
}

#[test]
fn resize_keeps_aspect_by_width() {
    let f = Frame::filled(100, 50, [10, 10, 10, 255]);
    let r = f.resized_to_width(40).unwrap();
    assert_eq!((r.width, r.height), (40, 20));
    assert_eq!(r.data.len(), 40 * 20 * 4);
    assert_eq!(r.pixel(5, 5), [10, 10, 10, 255]);
    assert_eq!(scaled_height(1000, 1300, 1000), 1300);
}

#[test]
fn straight_buffers_are_size_checked() {
    assert!(Frame::from_straight_rgba8(2, 2, vec![0; 15]).is_err());
    let f = Frame::from_straight_rgba8(1, 1, vec![200, 200, 200, 0]).unwrap();
    assert_eq!(f.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn straight_alpha_copy_undoes_premultiply() {
    let mut data = vec![200u8, 100, 40, 128, 10, 20, 30, 255, 5, 5, 5, 0];
    premultiply_rgba8_in_place(&mut data);
    let frame = Frame {
        width: 3,
        height: 1,
        data,
    };
    let straight = frame.to_straight_rgba8();
    for (got, want) in straight[..3].iter().zip([200u8, 100, 40]) {
        assert!(got.abs_diff(want) <= 2, "{got} vs {want}");
    }
    assert_eq!(straight[3], 128);
    assert_eq!(&straight[4..8], &[10, 20, 30, 255]);
    assert_eq!(&straight[8..12], &[0, 0, 0, 0]);
}
