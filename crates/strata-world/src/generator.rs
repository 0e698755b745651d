//! Procedural terrain for new chunks. Runs on worker threads.
//!
//! Heights come from a seamless global fBm field, so neighbouring chunks line
//! up without knowing about each other. Decorations (ore-like glowstone veins,
//! lava pools, trees, boulders) use a per-chunk RNG and stay inside the chunk.

use std::sync::Arc;

use glam::{IVec3, UVec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use strata_lighting::LightStaging;
use strata_voxel::{
    BlockRegistry, BlockTypeId, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, Chunk, RegistryError,
    TemplateRegistry, local_coords, local_index,
};

use crate::fbm::{FbmField, FbmParams};
use crate::seed::chunk_rng;

/// Room left above the highest possible surface for trees.
const HEADROOM: u32 = 12;
const DIRT_DEPTH: u32 = 3;
/// Unit temperature below which high ground and still water freeze.
const FREEZE_THRESHOLD: f64 = -0.25;
/// Columns this far above sea level count as high ground.
const HIGH_GROUND: u32 = 8;
const TREE_ATTEMPTS: u32 = 3;
const BOULDER_CHANCE: f64 = 0.15;
const LAVA_POOL_CHANCE: f64 = 0.4;
const MAX_GLOW_VEINS: u32 = 3;

/// Block ids the generator places, resolved once from the registry.
#[derive(Clone, Copy, Debug)]
struct Palette {
    stone: BlockTypeId,
    dirt: BlockTypeId,
    grass: BlockTypeId,
    sand: BlockTypeId,
    water: BlockTypeId,
    ice: BlockTypeId,
    glowstone: BlockTypeId,
    lava: BlockTypeId,
}

impl Palette {
    fn resolve(registry: &BlockRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            stone: registry.require("stone")?,
            dirt: registry.require("dirt")?,
            grass: registry.require("grass")?,
            sand: registry.require("sand")?,
            water: registry.require("water")?,
            ice: registry.require("ice")?,
            glowstone: registry.require("glowstone")?,
            lava: registry.require("lava")?,
        })
    }
}

/// Fills chunks with terrain. Shared read-only across worker threads.
pub struct TerrainGenerator {
    seed: u64,
    sea_level: u32,
    height: FbmField,
    temperature: FbmField,
    palette: Palette,
    registry: Arc<BlockRegistry>,
    templates: Arc<TemplateRegistry>,
}

impl TerrainGenerator {
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if the block registry lacks one
    /// of the terrain types.
    pub fn new(
        seed: u64,
        sea_level: u32,
        registry: Arc<BlockRegistry>,
        templates: Arc<TemplateRegistry>,
    ) -> Result<Self, RegistryError> {
        let palette = Palette::resolve(&registry)?;
        let height = FbmField::new(FbmParams {
            seed,
            ..Default::default()
        });
        let temperature = FbmField::new(FbmParams {
            seed: seed ^ 0x9E37_79B9_7F4A_7C15,
            octaves: 2,
            frequency: 0.003,
            amplitude: 1.0,
            ..Default::default()
        });
        Ok(Self {
            seed,
            sea_level: sea_level.min(CHUNK_SIZE_Z as u32 - HEADROOM),
            height,
            temperature,
            palette,
            registry,
            templates,
        })
    }

    /// Water level, clamped below the tree headroom.
    pub fn sea_level(&self) -> u32 {
        self.sea_level
    }

    /// z of the topmost terrain block at a global column.
    pub fn surface_height(&self, x: i32, y: i32) -> u32 {
        let raw = self.sea_level as f64 + 4.0 + self.height.sample(x as f64, y as f64);
        (raw.round() as i64).clamp(DIRT_DEPTH as i64 + 2, (CHUNK_SIZE_Z as u32 - HEADROOM) as i64)
            as u32
    }

    fn is_cold(&self, x: i32, y: i32) -> bool {
        self.temperature.sample_unit(x as f64, y as f64) < FREEZE_THRESHOLD
    }

    /// Writes terrain into `chunk`, derives its sky flags and stages its
    /// emitters for lighting.
    pub fn generate(&self, chunk: &mut Chunk, staging: &LightStaging) {
        let coord = chunk.coord();
        let origin = coord.origin();
        let mut rng = chunk_rng(self.seed, coord);
        let mut heights = [[0u32; CHUNK_SIZE_X]; CHUNK_SIZE_Y];

        for ly in 0..CHUNK_SIZE_Y as u32 {
            for lx in 0..CHUNK_SIZE_X as u32 {
                let (gx, gy) = (origin.x + lx as i32, origin.y + ly as i32);
                let h = self.surface_height(gx, gy);
                heights[ly as usize][lx as usize] = h;
                self.fill_column(chunk, lx, ly, h, self.is_cold(gx, gy));
            }
        }

        self.place_lava_pool(chunk, &mut rng);
        self.place_glow_veins(chunk, &heights, &mut rng);
        self.place_structures(chunk, &heights, &mut rng);

        chunk.derive_sky_flags(&self.registry);
        let emitters: Vec<IVec3> = chunk
            .emitter_indices(&self.registry)
            .map(|index| chunk.local_to_global(local_coords(index)))
            .collect();
        if !emitters.is_empty() {
            tracing::trace!("chunk {coord}: staging {} emitters", emitters.len());
            staging.extend(emitters);
        }
    }

    fn fill_column(&self, chunk: &mut Chunk, x: u32, y: u32, h: u32, cold: bool) {
        let p = &self.palette;
        let beach = h <= self.sea_level + 1;
        let high = h > self.sea_level + HIGH_GROUND;

        chunk.fill_column(x, y, 0..h - DIRT_DEPTH, p.stone);
        let sub = if beach { p.sand } else { p.dirt };
        chunk.fill_column(x, y, h - DIRT_DEPTH..h, sub);
        let top = match (beach, cold && high) {
            (true, _) => p.sand,
            (false, true) => p.ice,
            (false, false) => p.grass,
        };
        chunk.write_type(local_index(UVec3::new(x, y, h)), top);

        if h < self.sea_level {
            chunk.fill_column(x, y, h + 1..self.sea_level, p.water);
            let surface = if cold { p.ice } else { p.water };
            chunk.write_type(local_index(UVec3::new(x, y, self.sea_level)), surface);
        }
    }

    /// A small disc of lava near the bottom of the world.
    fn place_lava_pool(&self, chunk: &mut Chunk, rng: &mut ChaCha8Rng) {
        if !rng.random_bool(LAVA_POOL_CHANCE) {
            return;
        }
        let cx = rng.random_range(3..CHUNK_SIZE_X as i32 - 3);
        let cy = rng.random_range(3..CHUNK_SIZE_Y as i32 - 3);
        for dx in -2i32..=2 {
            for dy in -2i32..=2 {
                if dx * dx + dy * dy > 4 {
                    continue;
                }
                let (x, y) = ((cx + dx) as u32, (cy + dy) as u32);
                chunk.fill_column(x, y, 2..4, self.palette.lava);
            }
        }
    }

    /// Short random walks of glowstone through solid stone.
    fn place_glow_veins(
        &self,
        chunk: &mut Chunk,
        heights: &[[u32; CHUNK_SIZE_X]; CHUNK_SIZE_Y],
        rng: &mut ChaCha8Rng,
    ) {
        let veins = rng.random_range(0..=MAX_GLOW_VEINS);
        for _ in 0..veins {
            let x = rng.random_range(0..CHUNK_SIZE_X as i32);
            let y = rng.random_range(0..CHUNK_SIZE_Y as i32);
            let h = heights[y as usize][x as usize];
            if h < 12 {
                continue;
            }
            let mut pos = IVec3::new(x, y, rng.random_range(5..h as i32 - 6));
            for _ in 0..5 {
                let in_chunk = pos.x >= 0
                    && pos.y >= 0
                    && pos.z > 0
                    && (pos.x as usize) < CHUNK_SIZE_X
                    && (pos.y as usize) < CHUNK_SIZE_Y
                    && (pos.z as usize) < CHUNK_SIZE_Z;
                if !in_chunk {
                    break;
                }
                let index = local_index(pos.as_uvec3());
                if chunk.type_at(index) == self.palette.stone {
                    chunk.write_type(index, self.palette.glowstone);
                }
                let axis = rng.random_range(0..3);
                let step = if rng.random_bool(0.5) { 1 } else { -1 };
                pos[axis] += step;
            }
        }
    }

    /// Trees on grass and the occasional boulder, only where the whole
    /// template fits in this chunk.
    fn place_structures(
        &self,
        chunk: &mut Chunk,
        heights: &[[u32; CHUNK_SIZE_X]; CHUNK_SIZE_Y],
        rng: &mut ChaCha8Rng,
    ) {
        if let Some(tree) = self.templates.get("oak_tree") {
            for _ in 0..TREE_ATTEMPTS {
                let x = rng.random_range(0..CHUNK_SIZE_X);
                let y = rng.random_range(0..CHUNK_SIZE_Y);
                let h = heights[y][x];
                let on_grass = chunk.type_at(local_index(UVec3::new(x as u32, y as u32, h)))
                    == self.palette.grass;
                if on_grass {
                    tree.stamp(chunk, IVec3::new(x as i32, y as i32, h as i32 + 1));
                }
            }
        }

        if let Some(boulder) = self.templates.get("boulder")
            && rng.random_bool(BOULDER_CHANCE)
        {
            let x = rng.random_range(0..CHUNK_SIZE_X);
            let y = rng.random_range(0..CHUNK_SIZE_Y);
            let h = heights[y][x];
            if h >= self.sea_level {
                boulder.stamp(chunk, IVec3::new(x as i32, y as i32, h as i32 + 1));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
