//! Direction and axis types for face and rotation handling.

use serde::{Deserialize, Serialize};

/// The six cardinal directions / face directions.
///
/// Variant order matches the occlusion bit order used throughout the crate:
/// bit `i` of a 6-bit face mask refers to `Direction::ALL[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    East,
    West,
    Up,
    Down,
    South,
    North,
}

impl Direction {
    /// All six directions in bit order.
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
        Direction::South,
        Direction::North,
    ];

    /// Bit index of this direction in a face mask.
    #[inline]
    pub fn bit(&self) -> u8 {
        *self as u8
    }

    /// Face-mask bit for this direction.
    #[inline]
    pub fn mask(&self) -> u8 {
        1 << self.bit()
    }

    /// Get the integer offset for this direction.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
            Direction::South => (0, 0, 1),
            Direction::North => (0, 0, -1),
        }
    }

    /// Get the unit normal vector for this direction.
    pub fn normal(&self) -> [f32; 3] {
        let (x, y, z) = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// Get the opposite direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    /// Get the axis this direction is on.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::X,
            Direction::Up | Direction::Down => Axis::Y,
            Direction::South | Direction::North => Axis::Z,
        }
    }

    /// Whether this direction points toward positive coordinates on its axis.
    pub fn is_positive(&self) -> bool {
        matches!(self, Direction::East | Direction::Up | Direction::South)
    }

    /// Parse from a lowercase face name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "east" => Some(Direction::East),
            "west" => Some(Direction::West),
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "south" => Some(Direction::South),
            "north" => Some(Direction::North),
            _ => None,
        }
    }

    /// Snap an arbitrary vector to the nearest axis-aligned direction.
    ///
    /// Used to carry face identities through holder rotations: rotating a
    /// face normal by a multiple of 90 degrees always lands exactly on
    /// another cardinal direction, modulo float noise.
    pub fn from_vector(v: [f32; 3]) -> Direction {
        let ax = v[0].abs();
        let ay = v[1].abs();
        let az = v[2].abs();
        if ax >= ay && ax >= az {
            if v[0] >= 0.0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if ay >= az {
            if v[1] >= 0.0 {
                Direction::Up
            } else {
                Direction::Down
            }
        } else if v[2] >= 0.0 {
            Direction::South
        } else {
            Direction::North
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::South => "south",
            Direction::North => "north",
        };
        write!(f, "{}", name)
    }
}

/// The three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index into an `[f32; 3]` / `[i32; 3]`.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}
