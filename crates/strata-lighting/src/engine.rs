//! Worklist light propagation over the live chunk map.
//!
//! Every block carries two 4-bit channels. A block's target value for each
//! channel depends only on its own type, its sky flag and its six face
//! neighbours:
//!
//! - sky blocks get full outdoor light;
//! - an emitter's channel equals its emission strength;
//! - a light-passing block takes the brightest neighbour minus one;
//! - anything else is dark.
//!
//! Blocks whose target may have changed are queued. Draining the queue
//! recomputes each block and, when its value changes, queues its
//! light-passing neighbours. The per-block dirty bit keeps a block in the
//! queue at most once. When the queue is empty every block satisfies the rule.
//! Neighbours in chunks that are not live count as dark.

use std::collections::VecDeque;

use glam::IVec3;
use strata_voxel::{
    BlockIterator, BlockRegistry, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, CHUNK_VOLUME,
    ChunkCoord, ChunkMap, Direction, MAX_LIGHT, local_index,
};

use crate::staging::LightStaging;

/// Counters for one [`LightingEngine::propagate`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightingReport {
    /// Blocks popped from the queue.
    pub processed: usize,
    /// Blocks whose light value changed.
    pub changed: usize,
    /// Blocks still queued when the budget ran out.
    pub remaining: usize,
}

/// Owns the relight queue and the staging handle shared with workers.
pub struct LightingEngine {
    queue: VecDeque<BlockIterator>,
    staging: LightStaging,
    /// Staged positions whose chunk was not live yet.
    deferred: Vec<IVec3>,
}

impl LightingEngine {
    /// Creates an engine fed by `staging`.
    pub fn new(staging: LightStaging) -> Self {
        Self {
            queue: VecDeque::new(),
            staging,
            deferred: Vec::new(),
        }
    }

    /// The queue workers publish relight positions into.
    pub fn staging(&self) -> &LightStaging {
        &self.staging
    }

    /// Blocks currently queued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queues a block unless it is already queued or not live.
    pub fn mark_dirty(&mut self, map: &mut ChunkMap, it: BlockIterator) -> bool {
        let Some(block) = it.block_mut(map) else {
            return false;
        };
        if block.is_light_dirty() {
            return false;
        }
        block.set_light_dirty(true);
        self.queue.push_back(it);
        true
    }

    /// Moves staged positions into the queue.
    ///
    /// Positions in chunks that are not live are kept for a later merge while
    /// `still_pending` reports their chunk as on its way, and dropped
    /// otherwise. Returns the number of blocks queued.
    pub fn merge_staging(
        &mut self,
        map: &mut ChunkMap,
        still_pending: impl Fn(ChunkCoord) -> bool,
    ) -> usize {
        let mut staged = std::mem::take(&mut self.deferred);
        staged.extend(self.staging.take());

        let mut queued = 0;
        for position in staged {
            let it = BlockIterator::at_global(map, position);
            if it.is_valid() {
                if self.mark_dirty(map, it) {
                    queued += 1;
                }
            } else if still_pending(ChunkCoord::containing(position)) {
                self.deferred.push(position);
            }
        }
        queued
    }

    /// Queues the blocks of a newly live chunk whose initial light can be
    /// wrong: emitters, light-passing blocks touching the sky, and both sides
    /// of every edge shared with a live neighbour.
    ///
    /// Expects sky flags and initial light to have been derived already.
    pub fn seed_chunk(
        &mut self,
        map: &mut ChunkMap,
        registry: &BlockRegistry,
        coord: ChunkCoord,
    ) {
        let Some(chunk) = map.get(coord) else {
            return;
        };

        let mut seeds = Vec::new();
        for index in 0..CHUNK_VOLUME as u16 {
            let block = chunk.block(index);
            let def = registry.get(block.type_id());
            if def.is_emitter() {
                seeds.push(BlockIterator::new(coord, index));
            } else if !block.is_sky() && def.passes_light() {
                let it = BlockIterator::new(coord, index);
                let touches_sky = it
                    .neighbors(map)
                    .iter()
                    .any(|n| n.block(map).is_some_and(|b| b.is_sky()));
                if touches_sky {
                    seeds.push(it);
                }
            }
        }
        for it in seeds {
            self.mark_dirty(map, it);
        }

        for dir in Direction::HORIZONTAL {
            let neighbor = coord.neighbor(dir);
            if map.contains(neighbor) {
                self.seed_face(map, registry, coord, dir);
                self.seed_face(map, registry, neighbor, dir.opposite());
            }
        }
    }

    /// Queues the faces of live neighbours that bordered `coord`. Called after
    /// `coord` leaves the live map so light it contributed fades out.
    pub fn seed_edges(
        &mut self,
        map: &mut ChunkMap,
        registry: &BlockRegistry,
        coord: ChunkCoord,
    ) {
        for dir in Direction::HORIZONTAL {
            let neighbor = coord.neighbor(dir);
            if map.contains(neighbor) {
                self.seed_face(map, registry, neighbor, dir.opposite());
            }
        }
    }

    /// Queues every light-passing block on the face of `coord` pointing `dir`.
    fn seed_face(
        &mut self,
        map: &mut ChunkMap,
        registry: &BlockRegistry,
        coord: ChunkCoord,
        dir: Direction,
    ) {
        let max_x = CHUNK_SIZE_X as u32 - 1;
        let max_y = CHUNK_SIZE_Y as u32 - 1;
        for z in 0..CHUNK_SIZE_Z as u32 {
            for i in 0..CHUNK_SIZE_X as u32 {
                let local = match dir {
                    Direction::East => glam::UVec3::new(max_x, i, z),
                    Direction::West => glam::UVec3::new(0, i, z),
                    Direction::North => glam::UVec3::new(i, max_y, z),
                    Direction::South => glam::UVec3::new(i, 0, z),
                    Direction::Up | Direction::Down => return,
                };
                let it = BlockIterator::new(coord, local_index(local));
                let passes = it
                    .block(map)
                    .is_some_and(|b| registry.passes_light(b.type_id()));
                if passes {
                    self.mark_dirty(map, it);
                }
            }
        }
    }

    /// Updates sky flags below an edited block and queues everything the edit
    /// may have affected.
    ///
    /// Walks down the column from the edit. A block is sky when the block
    /// above it is sky (or it is the top layer) and it is not opaque. The walk
    /// stops at the first block below the edit whose flag is already correct.
    pub fn relight_column(
        &mut self,
        map: &mut ChunkMap,
        registry: &BlockRegistry,
        edited: BlockIterator,
    ) {
        if !edited.is_valid() {
            return;
        }
        let above = edited.up(map);
        let mut open = match above.block(map) {
            Some(block) => block.is_sky(),
            None => true,
        };

        let mut cursor = edited;
        let mut changed = Vec::new();
        while let Some(block) = cursor.block_mut(map) {
            let sky = open && !registry.is_opaque(block.type_id());
            if block.is_sky() != sky {
                block.set_sky(sky);
                changed.push(cursor);
            } else if cursor != edited {
                break;
            }
            open = sky;
            cursor = cursor.down(map);
        }
        if !changed.is_empty() {
            tracing::trace!("sky flags changed on {} blocks", changed.len());
        }

        for it in changed {
            self.mark_dirty(map, it);
        }
        self.mark_dirty(map, edited);
        for neighbor in edited.neighbors(map) {
            self.mark_dirty(map, neighbor);
        }
    }

    /// Drains the queue, processing at most `max_updates` blocks (0 drains to
    /// a fixed point).
    pub fn propagate(
        &mut self,
        map: &mut ChunkMap,
        registry: &BlockRegistry,
        max_updates: usize,
    ) -> LightingReport {
        let mut report = LightingReport::default();

        while let Some(it) = self.queue.pop_front() {
            if max_updates > 0 && report.processed >= max_updates {
                self.queue.push_front(it);
                break;
            }
            report.processed += 1;

            // The chunk may have been evicted while the block was queued.
            let Some(block) = it.block_mut(map) else {
                continue;
            };
            block.set_light_dirty(false);

            let Some((indoor, outdoor)) = ideal_light(map, registry, it) else {
                continue;
            };
            let Some(block) = it.block_mut(map) else {
                continue;
            };
            if block.light() == (indoor, outdoor) {
                continue;
            }
            block.set_light(indoor, outdoor);
            report.changed += 1;

            let Some(coord) = it.chunk() else {
                continue;
            };
            if let Some(chunk) = map.get_mut(coord) {
                chunk.mark_mesh_dirty();
            }
            for neighbor in it.neighbors(map) {
                let Some(n_coord) = neighbor.chunk() else {
                    continue;
                };
                if n_coord != coord
                    && let Some(chunk) = map.get_mut(n_coord)
                {
                    chunk.mark_mesh_dirty();
                }
                let passes = neighbor
                    .block(map)
                    .is_some_and(|b| registry.passes_light(b.type_id()));
                if passes {
                    self.mark_dirty(map, neighbor);
                }
            }
        }

        report.remaining = self.queue.len();
        report
    }

    /// Forgets all queued work, clearing the dirty bit of blocks still live.
    pub fn clear(&mut self, map: &mut ChunkMap) {
        for it in self.queue.drain(..) {
            if let Some(block) = it.block_mut(map) {
                block.set_light_dirty(false);
            }
        }
        self.deferred.clear();
    }
}

/// The `(indoor, outdoor)` value the propagation rule assigns to a block, or
/// `None` if the iterator does not point at a live block.
pub fn ideal_light(
    map: &ChunkMap,
    registry: &BlockRegistry,
    it: BlockIterator,
) -> Option<(u8, u8)> {
    let block = it.block(map)?;
    let def = registry.get(block.type_id());
    let passes = def.passes_light();

    let (mut brightest_in, mut brightest_out) = (0u8, 0u8);
    if passes {
        for neighbor in it.neighbors(map) {
            if let Some(n) = neighbor.block(map) {
                brightest_in = brightest_in.max(n.indoor_light());
                brightest_out = brightest_out.max(n.outdoor_light());
            }
        }
    }

    let channel = |emission: u8, brightest: u8| {
        if emission > 0 {
            emission.min(MAX_LIGHT)
        } else if passes {
            brightest.saturating_sub(1)
        } else {
            0
        }
    };

    let indoor = channel(def.indoor_emission, brightest_in);
    let outdoor = if block.is_sky() {
        MAX_LIGHT
    } else {
        channel(def.outdoor_emission, brightest_out)
    };
    Some((indoor, outdoor))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
