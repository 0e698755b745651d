//! Owner of all live chunks, keyed by [`ChunkCoord`].
//!
//! Neighbour relationships are not stored on the chunks. A chunk's neighbour
//! is whatever the map holds at the adjacent coordinate, so inserting or
//! removing a chunk links or unlinks it from all four sides at once.

use rustc_hash::FxHashMap;

use crate::chunk::Chunk;
use crate::coords::{ChunkCoord, Direction};

/// Live chunks with O(1) lookup, insert, and removal.
#[derive(Default)]
pub struct ChunkMap {
    chunks: FxHashMap<ChunkCoord, Box<Chunk>>,
}

impl ChunkMap {
    /// Creates an empty chunk map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a chunk under its own coordinate, returning any chunk it
    /// replaced.
    pub fn insert(&mut self, chunk: Box<Chunk>) -> Option<Box<Chunk>> {
        self.chunks.insert(chunk.coord(), chunk)
    }

    /// Removes and returns the chunk at `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Box<Chunk>> {
        self.chunks.remove(&coord)
    }

    /// Immutable access to a live chunk.
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord).map(|c| &**c)
    }

    /// Mutable access to a live chunk.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord).map(|c| &mut **c)
    }

    /// Whether a chunk is live at `coord`.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of live chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is live.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The live chunk adjacent to `coord` in `dir`. Always `None` for
    /// `Up` and `Down`, since chunks span the full height.
    pub fn neighbor(&self, coord: ChunkCoord, dir: Direction) -> Option<&Chunk> {
        match dir {
            Direction::Up | Direction::Down => None,
            _ => self.get(coord.neighbor(dir)),
        }
    }

    /// Whether all four horizontal neighbours of `coord` are live.
    pub fn has_all_neighbors(&self, coord: ChunkCoord) -> bool {
        coord
            .horizontal_neighbors()
            .iter()
            .all(|n| self.chunks.contains_key(n))
    }

    /// Coordinates of all live chunks, in arbitrary order.
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    /// All live chunks, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values().map(|c| &**c)
    }

    /// Mutable access to all live chunks, in arbitrary order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut().map(|c| &mut **c)
    }

    /// Removes every chunk, yielding them in arbitrary order.
    pub fn drain(&mut self) -> impl Iterator<Item = Box<Chunk>> + '_ {
        self.chunks.drain().map(|(_, chunk)| chunk)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(x: i32, y: i32) -> Box<Chunk> {
        Box::new(Chunk::new(ChunkCoord::new(x, y)))
    }

    #[test]
    fn test_insert_then_get() {
        let mut map = ChunkMap::new();
        assert!(map.insert(chunk(1, 2)).is_none());
        assert!(map.contains(ChunkCoord::new(1, 2)));
        assert_eq!(map.get(ChunkCoord::new(1, 2)).unwrap().coord(), ChunkCoord::new(1, 2));
        assert!(map.get(ChunkCoord::new(2, 1)).is_none());
    }

    #[test]
    fn test_remove_then_get_returns_none() {
        let mut map = ChunkMap::new();
        map.insert(chunk(0, 0));
        assert!(map.remove(ChunkCoord::new(0, 0)).is_some());
        assert!(map.get(ChunkCoord::new(0, 0)).is_none());
        assert!(map.remove(ChunkCoord::new(0, 0)).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_has_all_neighbors() {
        let mut map = ChunkMap::new();
        let center = ChunkCoord::new(0, 0);
        map.insert(chunk(0, 0));
        for (x, y) in [(1, 0), (-1, 0), (0, 1)] {
            map.insert(chunk(x, y));
        }
        assert!(!map.has_all_neighbors(center));

        map.insert(chunk(0, -1));
        assert!(map.has_all_neighbors(center));

        map.remove(ChunkCoord::new(1, 0));
        assert!(!map.has_all_neighbors(center));
    }

    #[test]
    fn test_neighbor_inverse() {
        let mut map = ChunkMap::new();
        map.insert(chunk(0, 0));
        map.insert(chunk(1, 0));
        map.insert(chunk(0, 1));

        let origin = ChunkCoord::new(0, 0);
        for dir in Direction::HORIZONTAL {
            let Some(neighbor) = map.neighbor(origin, dir) else {
                continue;
            };
            let back = map.neighbor(neighbor.coord(), dir.opposite()).unwrap();
            assert_eq!(back.coord(), origin);
        }
        assert_eq!(map.neighbor(origin, Direction::East).unwrap().coord(), ChunkCoord::new(1, 0));
        assert!(map.neighbor(origin, Direction::West).is_none());
        assert!(map.neighbor(origin, Direction::Up).is_none());
    }

    #[test]
    fn test_drain_empties_map() {
        let mut map = ChunkMap::new();
        map.insert(chunk(0, 0));
        map.insert(chunk(5, 5));
        assert_eq!(map.drain().count(), 2);
        assert_eq!(map.len(), 0);
    }
}
