//! Chunk coordinates and face directions.

use std::fmt;

use glam::{IVec2, IVec3, Vec2};
use serde::{Deserialize, Serialize};

use crate::chunk::{CHUNK_SIZE_X, CHUNK_SIZE_Y};

/// Horizontal position of a chunk column in chunk units.
///
/// Chunks span the full world height, so the grid is two-dimensional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The chunk containing the given global block position.
    pub fn containing(global: IVec3) -> Self {
        Self {
            x: global.x.div_euclid(CHUNK_SIZE_X as i32),
            y: global.y.div_euclid(CHUNK_SIZE_Y as i32),
        }
    }

    /// Global block position of this chunk's `(0, 0, 0)` corner.
    pub fn origin(self) -> IVec3 {
        IVec3::new(
            self.x * CHUNK_SIZE_X as i32,
            self.y * CHUNK_SIZE_Y as i32,
            0,
        )
    }

    /// Centre of the chunk in chunk-space units.
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Squared distance from a chunk-space point to this chunk's centre.
    pub fn distance_squared_to(self, point: Vec2) -> f32 {
        self.center().distance_squared(point)
    }

    /// The adjacent chunk in a horizontal direction. Vertical directions
    /// return `self` because chunks span the whole height.
    pub fn neighbor(self, dir: Direction) -> Self {
        let offset = dir.chunk_offset();
        Self::new(self.x + offset.x, self.y + offset.y)
    }

    /// All four horizontal neighbours in [`Direction::HORIZONTAL`] order.
    pub fn horizontal_neighbors(self) -> [ChunkCoord; 4] {
        Direction::HORIZONTAL.map(|dir| self.neighbor(dir))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the six face directions. North is +y, east is +x and up is +z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    /// All six face directions.
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// The four directions that cross into neighbouring chunks.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Unit offset in block space.
    pub fn offset(self) -> IVec3 {
        match self {
            Direction::North => IVec3::Y,
            Direction::South => IVec3::NEG_Y,
            Direction::East => IVec3::X,
            Direction::West => IVec3::NEG_X,
            Direction::Up => IVec3::Z,
            Direction::Down => IVec3::NEG_Z,
        }
    }

    /// Offset in the chunk grid (zero for up and down).
    pub fn chunk_offset(self) -> IVec2 {
        let o = self.offset();
        IVec2::new(o.x, o.y)
    }

    /// The direction matching a unit axis vector, if any.
    pub fn from_offset(offset: IVec3) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.offset() == offset)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
