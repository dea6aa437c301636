use super::*;

fn geom() -> IconGeometry {
    IconGeometry {
        frame_width: 1920,
        width: 200,
        dx: 300,
        margin: 60,
        y: 60,
    }
}

fn mv(at_time: f64, from_side: IconSide, to_side: IconSide) -> IconMove {
    IconMove {
        at_time,
        from_side,
        to_side,
        anim_sec: 0.5,
    }
}

#[test]
fn positions_follow_frame_width() {
    let g = geom();
    assert_eq!(g.right_x(), 1660.0);
    assert_eq!(g.left_x(), 1360.0);
}

#[test]
fn track_starts_right_and_ramps_linearly() {
    let track = IconTrack::new(
        geom(),
        vec![
            mv(2.0, IconSide::Right, IconSide::Left),
            mv(4.0, IconSide::Left, IconSide::Right),
        ],
    );
    assert_eq!(track.position_at(0.0), Point::new(1660.0, 60.0));
    assert_eq!(track.side_at(1.99), IconSide::Right);
    assert_eq!(track.position_at(2.25).x, 1510.0);
    assert_eq!(track.position_at(2.5).x, 1360.0);
    assert_eq!(track.side_at(3.0), IconSide::Left);
    assert_eq!(track.position_at(4.25).x, 1510.0);
    assert_eq!(track.position_at(10.0).x, 1660.0);
}

#[test]
fn zero_animation_jumps() {
    let mut m = mv(1.0, IconSide::Right, IconSide::Left);
    m.anim_sec = 0.0;
    let track = IconTrack::new(geom(), vec![m]);
    assert_eq!(track.position_at(1.0).x, 1360.0);
    assert_eq!(track.geometry().y, 60);
}
