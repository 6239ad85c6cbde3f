//! Closed set of the eight walk directions.
//!
//! Each direction knows its unit pixel offset, its two 45° neighbors
//! (probed when an outer ring edge runs at an angle), and which
//! perpendicular direction to side-step in on a given retry.

use serde::{Deserialize, Serialize};

use crate::Point;

/// One of the eight cardinal/diagonal walk directions.
///
/// Screen coordinates: y grows downward, so [`Direction::Up`] decrements y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    LeftUp,
    Up,
    RightUp,
    Right,
    RightDown,
    Down,
    LeftDown,
}

impl Direction {
    /// All eight directions, in clockwise order starting due left.
    pub const ALL: [Direction; 8] = [
        Direction::Left,
        Direction::LeftUp,
        Direction::Up,
        Direction::RightUp,
        Direction::Right,
        Direction::RightDown,
        Direction::Down,
        Direction::LeftDown,
    ];

    /// Unit step offset `(dx, dy)`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::LeftUp => (-1, -1),
            Self::Up => (0, -1),
            Self::RightUp => (1, -1),
            Self::Right => (1, 0),
            Self::RightDown => (1, 1),
            Self::Down => (0, 1),
            Self::LeftDown => (-1, 1),
        }
    }

    /// The two directions 45° to either side, probed during outer-edge
    /// walks when straight-line continuity breaks.
    pub fn adjacent(self) -> (Direction, Direction) {
        match self {
            Self::Left | Self::Right => (Self::Up, Self::Down),
            Self::Up | Self::Down => (Self::Left, Self::Right),
            Self::LeftDown => (Self::Left, Self::Down),
            Self::LeftUp => (Self::Left, Self::Up),
            Self::RightUp => (Self::Right, Self::Up),
            Self::RightDown => (Self::Right, Self::Down),
        }
    }

    /// Perpendicular side-step direction for retry `iteration`,
    /// alternating sides on even/odd retries.
    pub fn side_step(self, iteration: u32) -> Direction {
        match self {
            Self::Left | Self::Right => {
                if iteration % 2 == 1 {
                    Self::Up
                } else {
                    Self::Down
                }
            }
            _ => {
                if iteration % 2 == 1 {
                    Self::Left
                } else {
                    Self::Right
                }
            }
        }
    }

    /// Stable index into per-direction arrays, matching [`Direction::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::LeftUp => 1,
            Self::Up => 2,
            Self::RightUp => 3,
            Self::Right => 4,
            Self::RightDown => 5,
            Self::Down => 6,
            Self::LeftDown => 7,
        }
    }

    /// Apply `steps` unit offsets to a point.
    pub fn advance(self, point: Point, steps: i32) -> Point {
        let (dx, dy) = self.offset();
        Point::new(point.x + dx * steps, point.y + dy * steps)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::LeftUp => "left_up",
            Self::Up => "up",
            Self::RightUp => "right_up",
            Self::Right => "right",
            Self::RightDown => "right_down",
            Self::Down => "down",
            Self::LeftDown => "left_down",
        };
        f.write_str(name)
    }
}
