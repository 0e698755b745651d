//! Cheap, copyable handles to a single block that can walk to face neighbours.
//!
//! A [`BlockIterator`] is a `(chunk, index)` pair. Moving inside a chunk is a
//! single add or subtract on one bit field of the index. Moving across a
//! horizontal chunk boundary wraps the field to the opposite extreme and looks
//! the neighbour up in the [`ChunkMap`]. If that chunk is not live the result
//! is the null iterator. Moving up or down never leaves the chunk, so stepping
//! off the top or bottom of the world is also null.

use glam::{IVec3, UVec3};

use crate::block::Block;
use crate::chunk::{
    BlockIndex, CHUNK_SIZE_Z, MASK_X, MASK_Y, MASK_Z, SHIFT_X, SHIFT_Y, SHIFT_Z, local_coords,
    local_index,
};
use crate::chunk_map::ChunkMap;
use crate::coords::{ChunkCoord, Direction};

/// A block position inside a live chunk, or the null position. Cheap to
/// copy; resolved against a [`ChunkMap`] on every access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockIterator {
    chunk: Option<ChunkCoord>,
    index: BlockIndex,
}

impl BlockIterator {
    /// The null iterator. Every step from it stays null.
    pub const NONE: Self = Self {
        chunk: None,
        index: 0,
    };

    /// Points at block `index` of `chunk`.
    pub fn new(chunk: ChunkCoord, index: BlockIndex) -> Self {
        Self {
            chunk: Some(chunk),
            index,
        }
    }

    /// Points at the block with local coordinates `local` in `chunk`.
    pub fn from_local(chunk: ChunkCoord, local: UVec3) -> Self {
        Self::new(chunk, local_index(local))
    }

    /// Iterator at a global block position, or null if the position is
    /// outside the world's height or its chunk is not live.
    pub fn at_global(map: &ChunkMap, global: IVec3) -> Self {
        if global.z < 0 || global.z >= CHUNK_SIZE_Z as i32 {
            return Self::NONE;
        }
        let coord = ChunkCoord::containing(global);
        if !map.contains(coord) {
            return Self::NONE;
        }
        Self::from_local(coord, (global - coord.origin()).as_uvec3())
    }

    /// Whether this is a real position rather than the null iterator.
    pub fn is_valid(&self) -> bool {
        self.chunk.is_some()
    }

    /// The chunk coordinate, or `None` for the null iterator.
    pub fn chunk(&self) -> Option<ChunkCoord> {
        self.chunk
    }

    /// Index of the block within its chunk.
    pub fn index(&self) -> BlockIndex {
        self.index
    }

    /// Local coordinates of the block within its chunk.
    pub fn local_coords(&self) -> UVec3 {
        local_coords(self.index)
    }

    /// World position of the block, or `None` for the null iterator.
    pub fn global_coords(&self) -> Option<IVec3> {
        self.chunk
            .map(|coord| coord.origin() + self.local_coords().as_ivec3())
    }

    /// The block, if its chunk is live.
    pub fn block<'a>(&self, map: &'a ChunkMap) -> Option<&'a Block> {
        let chunk = map.get(self.chunk?)?;
        Some(chunk.block(self.index))
    }

    /// Mutable access to the block, if its chunk is live.
    pub fn block_mut<'a>(&self, map: &'a mut ChunkMap) -> Option<&'a mut Block> {
        let chunk = map.get_mut(self.chunk?)?;
        Some(chunk.block_mut(self.index))
    }

    /// Whether a step in `dir` would leave this block's chunk horizontally.
    pub fn is_at_edge(&self, dir: Direction) -> bool {
        let (mask, _, positive) = field(dir);
        let value = self.index & mask;
        match dir {
            Direction::Up | Direction::Down => false,
            _ if positive => value == mask,
            _ => value == 0,
        }
    }

    /// The face neighbour in `dir`.
    pub fn step(self, map: &ChunkMap, dir: Direction) -> Self {
        let Some(coord) = self.chunk else {
            return Self::NONE;
        };
        let (mask, unit, positive) = field(dir);
        let value = self.index & mask;

        if positive && value != mask {
            return Self::new(coord, self.index + unit);
        }
        if !positive && value != 0 {
            return Self::new(coord, self.index - unit);
        }
        if matches!(dir, Direction::Up | Direction::Down) {
            return Self::NONE;
        }

        // Wrap the field to the opposite extreme in the neighbouring chunk.
        let wrapped = if positive {
            self.index & !mask
        } else {
            self.index | mask
        };
        let neighbor = coord.neighbor(dir);
        if map.contains(neighbor) {
            Self::new(neighbor, wrapped)
        } else {
            Self::NONE
        }
    }

    /// One block towards +y.
    pub fn north(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::North)
    }

    /// One block towards -y.
    pub fn south(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::South)
    }

    /// One block towards +x.
    pub fn east(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::East)
    }

    /// One block towards -x.
    pub fn west(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::West)
    }

    /// One block up. Null above the top layer.
    pub fn up(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::Up)
    }

    /// One block down. Null below the bottom layer.
    pub fn down(self, map: &ChunkMap) -> Self {
        self.step(map, Direction::Down)
    }

    /// All six face neighbours in [`Direction::ALL`] order. Missing ones are null.
    pub fn neighbors(self, map: &ChunkMap) -> [BlockIterator; 6] {
        Direction::ALL.map(|dir| self.step(map, dir))
    }
}

/// Bit field for an axis: `(mask, one unit, moves toward the positive end)`.
fn field(dir: Direction) -> (u16, u16, bool) {
    match dir {
        Direction::East => (MASK_X, 1 << SHIFT_X, true),
        Direction::West => (MASK_X, 1 << SHIFT_X, false),
        Direction::North => (MASK_Y, 1 << SHIFT_Y, true),
        Direction::South => (MASK_Y, 1 << SHIFT_Y, false),
        Direction::Up => (MASK_Z, 1 << SHIFT_Z, true),
        Direction::Down => (MASK_Z, 1 << SHIFT_Z, false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{CHUNK_SIZE_X, CHUNK_SIZE_Y, Chunk};

    fn map_with(coords: &[(i32, i32)]) -> ChunkMap {
        let mut map = ChunkMap::new();
        for &(x, y) in coords {
            map.insert(Box::new(Chunk::new(ChunkCoord::new(x, y))));
        }
        map
    }

    fn full_3x3() -> ChunkMap {
        let mut coords = Vec::new();
        for x in -1..=1 {
            for y in -1..=1 {
                coords.push((x, y));
            }
        }
        map_with(&coords)
    }

    #[test]
    fn test_step_inside_chunk() {
        let map = map_with(&[(0, 0)]);
        let it = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(5, 5, 5));
        assert_eq!(it.east(&map).local_coords(), UVec3::new(6, 5, 5));
        assert_eq!(it.west(&map).local_coords(), UVec3::new(4, 5, 5));
        assert_eq!(it.north(&map).local_coords(), UVec3::new(5, 6, 5));
        assert_eq!(it.south(&map).local_coords(), UVec3::new(5, 4, 5));
        assert_eq!(it.up(&map).local_coords(), UVec3::new(5, 5, 6));
        assert_eq!(it.down(&map).local_coords(), UVec3::new(5, 5, 4));
    }

    #[test]
    fn test_step_across_chunk_boundary() {
        let map = full_3x3();
        let origin = ChunkCoord::new(0, 0);

        let east_edge = BlockIterator::from_local(origin, UVec3::new(15, 3, 40));
        let crossed = east_edge.east(&map);
        assert_eq!(crossed.chunk(), Some(ChunkCoord::new(1, 0)));
        assert_eq!(crossed.local_coords(), UVec3::new(0, 3, 40));

        let south_edge = BlockIterator::from_local(origin, UVec3::new(7, 0, 2));
        let crossed = south_edge.south(&map);
        assert_eq!(crossed.chunk(), Some(ChunkCoord::new(0, -1)));
        assert_eq!(crossed.local_coords(), UVec3::new(7, 15, 2));
    }

    #[test]
    fn test_missing_neighbor_is_null() {
        let map = map_with(&[(0, 0)]);
        let it = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(0, 8, 8));
        assert!(!it.west(&map).is_valid());
        assert!(!it.west(&map).east(&map).is_valid());
    }

    #[test]
    fn test_vertical_steps_never_cross() {
        let map = full_3x3();
        let top = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(1, 1, 127));
        assert!(!top.up(&map).is_valid());
        let bottom = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(1, 1, 0));
        assert!(!bottom.down(&map).is_valid());
    }

    #[test]
    fn test_neighbor_inverse_law() {
        let map = full_3x3();
        let coord = ChunkCoord::new(0, 0);
        for x in 0..CHUNK_SIZE_X as u32 {
            for y in 0..CHUNK_SIZE_Y as u32 {
                for z in [1u32, 64, 126] {
                    let p = BlockIterator::from_local(coord, UVec3::new(x, y, z));
                    for dir in Direction::ALL {
                        let back = p.step(&map, dir).step(&map, dir.opposite());
                        assert_eq!(back, p, "{dir:?} from {:?}", p.local_coords());
                    }
                }
            }
        }
    }

    #[test]
    fn test_at_global_and_back() {
        let map = full_3x3();
        let global = IVec3::new(-5, 20, 33);
        let it = BlockIterator::at_global(&map, global);
        assert_eq!(it.chunk(), Some(ChunkCoord::new(-1, 1)));
        assert_eq!(it.global_coords(), Some(global));

        assert!(!BlockIterator::at_global(&map, IVec3::new(0, 0, 128)).is_valid());
        assert!(!BlockIterator::at_global(&map, IVec3::new(0, 0, -1)).is_valid());
        assert!(!BlockIterator::at_global(&map, IVec3::new(100, 0, 5)).is_valid());
    }

    #[test]
    fn test_block_access_through_map() {
        let mut map = map_with(&[(0, 0)]);
        let it = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(2, 2, 2));
        it.block_mut(&mut map).unwrap().set_indoor_light(9);
        assert_eq!(it.block(&map).unwrap().indoor_light(), 9);
        assert!(BlockIterator::NONE.block(&map).is_none());
    }

    #[test]
    fn test_is_at_edge() {
        let it = BlockIterator::from_local(ChunkCoord::new(0, 0), UVec3::new(15, 0, 127));
        assert!(it.is_at_edge(Direction::East));
        assert!(it.is_at_edge(Direction::South));
        assert!(!it.is_at_edge(Direction::West));
        assert!(!it.is_at_edge(Direction::Up));
    }
}
