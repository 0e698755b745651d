//! Fixed-size chunk storage with bit-field addressing, dirty flags and lifecycle state.
//!
//! A chunk is a `16 × 16 × 128` column of [`Block`]s. Every dimension is a
//! power of two, so a local position packs into a single [`BlockIndex`] as
//! `x | y << 4 | z << 8`, and moving one step along an axis is an add or
//! subtract on that axis's bit field.

use glam::{IVec3, UVec3};

use crate::block::{Block, BlockTypeId, MAX_LIGHT};
use crate::coords::ChunkCoord;
use crate::registry::BlockRegistry;

/// Blocks along x.
pub const CHUNK_SIZE_X: usize = 16;
/// Blocks along y.
pub const CHUNK_SIZE_Y: usize = 16;
/// Blocks along z (world height).
pub const CHUNK_SIZE_Z: usize = 128;
/// Total blocks in one chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;
/// Blocks in one horizontal layer.
pub const LAYER_SIZE: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y;

/// Bits of the block index holding x.
pub const BITS_X: u32 = 4;
/// Bits of the block index holding y.
pub const BITS_Y: u32 = 4;
/// Bits of the block index holding z.
pub const BITS_Z: u32 = 7;

/// Position of the x field in a block index.
pub const SHIFT_X: u32 = 0;
/// Position of the y field in a block index.
pub const SHIFT_Y: u32 = BITS_X;
/// Position of the z field in a block index.
pub const SHIFT_Z: u32 = BITS_X + BITS_Y;

/// Mask selecting the x field of a block index.
pub const MASK_X: u16 = ((1 << BITS_X) - 1) << SHIFT_X;
/// Mask selecting the y field of a block index.
pub const MASK_Y: u16 = ((1 << BITS_Y) - 1) << SHIFT_Y;
/// Mask selecting the z field of a block index.
pub const MASK_Z: u16 = ((1 << BITS_Z) - 1) << SHIFT_Z;

/// Packed local position inside a chunk (`0..CHUNK_VOLUME`).
pub type BlockIndex = u16;

/// Dirty-flag bit: chunk mesh needs rebuilding.
pub const MESH_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: chunk was edited and must be written back on eviction.
pub const SAVE_DIRTY: u8 = 0b0000_0010;

/// Packs local coordinates into a block index. Components must be in range.
pub fn local_index(local: UVec3) -> BlockIndex {
    debug_assert!(
        (local.x as usize) < CHUNK_SIZE_X
            && (local.y as usize) < CHUNK_SIZE_Y
            && (local.z as usize) < CHUNK_SIZE_Z,
        "local coordinates out of range: {local}"
    );
    ((local.x << SHIFT_X) | (local.y << SHIFT_Y) | (local.z << SHIFT_Z)) as BlockIndex
}

/// Unpacks a block index into local coordinates.
pub fn local_coords(index: BlockIndex) -> UVec3 {
    UVec3::new(
        ((index & MASK_X) >> SHIFT_X) as u32,
        ((index & MASK_Y) >> SHIFT_Y) as u32,
        ((index & MASK_Z) >> SHIFT_Z) as u32,
    )
}

/// Lifecycle stage of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Allocated, no job submitted yet.
    Initializing,
    /// A generation job owns the chunk.
    Generating,
    /// A load job owns the chunk.
    LoadingFromDisk,
    /// Present in the live map.
    Active,
}

/// A column of blocks plus its bookkeeping.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    blocks: Box<[Block]>,
    state: ChunkState,
    dirty: u8,
    /// Incremented on every edit.
    version: u64,
}

impl Chunk {
    /// Creates an all-air chunk in the `Initializing` state.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![Block::default(); CHUNK_VOLUME].into_boxed_slice(),
            state: ChunkState::Initializing,
            dirty: 0,
            version: 0,
        }
    }

    /// Coordinate of this chunk.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Moves the chunk to another lifecycle state.
    pub fn set_state(&mut self, state: ChunkState) {
        self.state = state;
    }

    /// Counter bumped by every edit through `place_block`/`remove_block`.
    pub fn version(&self) -> u64 {
        self.version
    }

    // -- Addressing --------------------------------------------------------

    /// Converts a global block position to local coordinates, or `None` if
    /// the position lies outside this chunk.
    pub fn global_to_local(&self, global: IVec3) -> Option<UVec3> {
        let rel = global - self.coord.origin();
        let in_range = rel.x >= 0
            && rel.y >= 0
            && rel.z >= 0
            && (rel.x as usize) < CHUNK_SIZE_X
            && (rel.y as usize) < CHUNK_SIZE_Y
            && (rel.z as usize) < CHUNK_SIZE_Z;
        in_range.then(|| rel.as_uvec3())
    }

    /// Converts local coordinates to a global block position.
    pub fn local_to_global(&self, local: UVec3) -> IVec3 {
        self.coord.origin() + local.as_ivec3()
    }

    // -- Block access ------------------------------------------------------

    /// The block at `index`.
    pub fn block(&self, index: BlockIndex) -> &Block {
        &self.blocks[index as usize]
    }

    /// Mutable access without touching dirty flags. Used by lighting.
    pub fn block_mut(&mut self, index: BlockIndex) -> &mut Block {
        &mut self.blocks[index as usize]
    }

    /// Type of the block at `index`.
    pub fn type_at(&self, index: BlockIndex) -> BlockTypeId {
        self.blocks[index as usize].type_id()
    }

    /// All blocks in index order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Writes a type without marking the chunk dirty. Generation and decoding
    /// build chunks this way.
    pub fn write_type(&mut self, index: BlockIndex, type_id: BlockTypeId) {
        self.blocks[index as usize].set_type_id(type_id);
    }

    /// Places a block, returning the type it replaced.
    pub fn place_block(&mut self, index: BlockIndex, type_id: BlockTypeId) -> BlockTypeId {
        let block = &mut self.blocks[index as usize];
        let old = block.type_id();
        block.set_type_id(type_id);
        self.dirty |= MESH_DIRTY | SAVE_DIRTY;
        self.version += 1;
        old
    }

    /// Replaces a block with air, returning the removed type.
    pub fn remove_block(&mut self, index: BlockIndex) -> BlockTypeId {
        self.place_block(index, BlockTypeId::AIR)
    }

    /// Fills `z_range` of the column at `(x, y)` with one type.
    pub fn fill_column(
        &mut self,
        x: u32,
        y: u32,
        z_range: std::ops::Range<u32>,
        type_id: BlockTypeId,
    ) {
        for z in z_range {
            self.write_type(local_index(UVec3::new(x, y, z)), type_id);
        }
    }

    /// Highest non-air z in the column, or `None` for an empty column.
    pub fn column_height(&self, x: u32, y: u32) -> Option<u32> {
        (0..CHUNK_SIZE_Z as u32)
            .rev()
            .find(|&z| !self.type_at(local_index(UVec3::new(x, y, z))).is_air())
    }

    // -- Dirty flags -------------------------------------------------------

    /// Whether the chunk's mesh needs rebuilding.
    pub fn is_mesh_dirty(&self) -> bool {
        self.dirty & MESH_DIRTY != 0
    }

    /// Flags the mesh for a rebuild.
    pub fn mark_mesh_dirty(&mut self) {
        self.dirty |= MESH_DIRTY;
    }

    /// Clears the rebuild flag once the mesh is scheduled.
    pub fn clear_mesh_dirty(&mut self) {
        self.dirty &= !MESH_DIRTY;
    }

    /// Whether the chunk was edited since it was generated or loaded.
    pub fn needs_save(&self) -> bool {
        self.dirty & SAVE_DIRTY != 0
    }

    /// Clears the unsaved-edits flag after a successful write.
    pub fn mark_saved(&mut self) {
        self.dirty &= !SAVE_DIRTY;
    }

    // -- Derived state -----------------------------------------------------

    /// Recomputes sky flags for every column and resets light.
    ///
    /// Walking down from the top, blocks are sky until the first opaque one.
    /// Sky blocks start with full outdoor light, everything else starts dark.
    pub fn derive_sky_flags(&mut self, registry: &BlockRegistry) {
        for y in 0..CHUNK_SIZE_Y as u32 {
            for x in 0..CHUNK_SIZE_X as u32 {
                let mut open = true;
                for z in (0..CHUNK_SIZE_Z as u32).rev() {
                    let block = &mut self.blocks[local_index(UVec3::new(x, y, z)) as usize];
                    if open && registry.is_opaque(block.type_id()) {
                        open = false;
                    }
                    block.set_sky(open);
                    block.set_light_dirty(false);
                    block.set_light(0, if open { MAX_LIGHT } else { 0 });
                }
            }
        }
    }

    /// Indices of every block whose type emits light.
    pub fn emitter_indices<'a>(
        &'a self,
        registry: &'a BlockRegistry,
    ) -> impl Iterator<Item = BlockIndex> + 'a {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| registry.get(block.type_id()).is_emitter())
            .map(|(i, _)| i as BlockIndex)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
