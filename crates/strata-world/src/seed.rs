//! Per-chunk RNG derivation from the world seed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::ChunkCoord;

/// Combines the world seed and a chunk coordinate into a well-mixed u64.
pub fn derive_chunk_seed(world_seed: u64, coord: ChunkCoord) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_seed.hash(&mut hasher);
    coord.x.hash(&mut hasher);
    coord.y.hash(&mut hasher);
    hasher.finish()
}

/// A deterministic RNG for one chunk. The same `(world_seed, coord)` always
/// yields the same sequence, on any thread.
pub fn chunk_rng(world_seed: u64, coord: ChunkCoord) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_chunk_seed(world_seed, coord))
}
