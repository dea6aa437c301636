use crate::foundation::core::Point;
use crate::foundation::math::lerp;
use crate::schedule::ops::IconMove;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconSide {
    Right,
    Left,
}

impl IconSide {
    pub fn flipped(self) -> Self {
        match self {
            Self::Right => Self::Left,
            Self::Left => Self::Right,
        }
    }
}

/// Icon placement relative to the output frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IconGeometry {
    pub frame_width: u32,
    pub width: u32,
    pub dx: u32,
    pub margin: u32,
    pub y: u32,
}

impl IconGeometry {
    pub fn right_x(&self) -> f64 {
        f64::from(self.frame_width) - f64::from(self.margin) - f64::from(self.width)
    }

    pub fn left_x(&self) -> f64 {
        self.right_x() - f64::from(self.dx)
    }

    pub fn x(&self, side: IconSide) -> f64 {
        match side {
            IconSide::Right => self.right_x(),
            IconSide::Left => self.left_x(),
        }
    }
}

/// Icon position over source time. Starts on the right; each move ramps linearly.
#[derive(Clone, Debug, PartialEq)]
pub struct IconTrack {
    geometry: IconGeometry,
    moves: Vec<IconMove>,
}

impl IconTrack {
    pub fn new(geometry: IconGeometry, mut moves: Vec<IconMove>) -> Self {
        moves.sort_by(|a, b| a.at_time.total_cmp(&b.at_time));
        Self { geometry, moves }
    }

    pub fn geometry(&self) -> &IconGeometry {
        &self.geometry
    }

    pub fn side_at(&self, t: f64) -> IconSide {
        self.moves
            .iter()
            .rev()
            .find(|m| m.at_time <= t)
            .map_or(IconSide::Right, |m| m.to_side)
    }

    pub fn position_at(&self, t: f64) -> Point {
        let y = f64::from(self.geometry.y);
        let Some(m) = self.moves.iter().rev().find(|m| m.at_time <= t) else {
            return Point::new(self.geometry.right_x(), y);
        };
        let to = self.geometry.x(m.to_side);
        let elapsed = t - m.at_time;
        if m.anim_sec <= 0.0 || elapsed >= m.anim_sec {
            return Point::new(to, y);
        }
        let from = self.geometry.x(m.from_side);
        Point::new(lerp(from, to, elapsed / m.anim_sec), y)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/icon.rs"]
mod tests;
