use crate::error::ConstraintError;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// One of the four cardinal directions, stored as a counter-clockwise angle.
///
/// Rows grow downward, so `Up` points toward smaller `y`.
///
/// ```text
///            Up (90)
///              ▲
/// Left (180) ◀─┼─▶ Right (0)
///              ▼
///          Down (270)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Right,
    Up,
    Left,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Up, Direction::Left, Direction::Down];

    pub fn degrees(self) -> i32 {
        match self {
            Direction::Right => 0,
            Direction::Up => 90,
            Direction::Left => 180,
            Direction::Down => 270,
        }
    }

    /// Build from an angle; any multiple of 90 (including negative ones) is accepted.
    pub fn from_degrees(degrees: i32) -> Option<Direction> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Direction::Right),
            90 => Some(Direction::Up),
            180 => Some(Direction::Left),
            _ => Some(Direction::Down),
        }
    }

    /// Rotate counter-clockwise by `quarter_turns × 90°`.
    pub fn rotate(self, quarter_turns: i32) -> Direction {
        match (self.degrees() / 90 + quarter_turns).rem_euclid(4) {
            0 => Direction::Right,
            1 => Direction::Up,
            2 => Direction::Left,
            _ => Direction::Down,
        }
    }

    pub fn opposite(self) -> Direction {
        self.rotate(2)
    }

    /// The coordinate-increasing direction on the same axis (`Left → Right`, `Up → Down`).
    pub fn abs(self) -> Direction {
        match self {
            Direction::Right | Direction::Left => Direction::Right,
            Direction::Up | Direction::Down => Direction::Down,
        }
    }

    /// `+1` when moving in this direction increases the coordinate, else `-1`.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Right | Direction::Down => 1,
            Direction::Left | Direction::Up => -1,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }

    /// The two directions perpendicular to this one.
    pub fn orthogonal(self) -> [Direction; 2] {
        [self.rotate(1), self.rotate(-1)]
    }

    /// Name of the rectangle side this direction faces.
    pub fn side_name(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Up => "top",
            Direction::Left => "left",
            Direction::Down => "bottom",
        }
    }
}

impl Add for Direction {
    type Output = Direction;

    fn add(self, rhs: Direction) -> Direction {
        self.rotate(rhs.degrees() / 90)
    }
}

impl Sub for Direction {
    type Output = Direction;

    fn sub(self, rhs: Direction) -> Direction {
        self.rotate(-rhs.degrees() / 90)
    }
}

impl Neg for Direction {
    type Output = Direction;

    fn neg(self) -> Direction {
        self.opposite()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.side_name())
    }
}

impl FromStr for Direction {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "right" | "r" | "east" | "0" => Ok(Direction::Right),
            "top" | "t" | "up" | "above" | "north" | "90" => Ok(Direction::Up),
            "left" | "l" | "west" | "180" => Ok(Direction::Left),
            "bottom" | "b" | "down" | "below" | "south" | "270" => Ok(Direction::Down),
            _ => Err(ConstraintError::UnknownDirection(s.to_string())),
        }
    }
}
