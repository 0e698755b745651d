//! The streaming world: activates chunks around a viewer, evicts distant
//! ones, applies finished background jobs and keeps lighting converged.
//!
//! A coordinate lives in at most one of three places. `initializing` holds
//! coordinates whose generate or load job is in flight (the job owns the
//! chunk), `live` holds active chunks, and `saving` holds evicted chunks whose
//! save job is in flight.

use std::sync::Arc;

use glam::{IVec3, Vec2, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use strata_lighting::{LightStaging, LightingEngine, LightingReport, SkyState};
use strata_voxel::{
    Block, BlockIterator, BlockRegistry, BlockTypeId, CHUNK_SIZE_X, CHUNK_SIZE_Y, Chunk,
    ChunkCoord, ChunkMap, ChunkState, Direction, TemplateRegistry,
};

use crate::collision::{self, Aabb, PushOut};
use crate::error::WorldError;
use crate::executor::{InlineExecutor, JobExecutor, WorkerPool};
use crate::generator::TerrainGenerator;
use crate::jobs::{Job, JobContext, JobOutcome};
use crate::raycast::{self, RaycastResult};
use crate::store::ChunkStore;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Largest accepted streaming radius, in chunks. Activation scans a square of
/// this half-width every tick.
pub const MAX_STREAMING_RADIUS: f32 = 256.0;

/// Streaming radii, per-tick budgets and world generation inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamingConfig {
    /// Chunks whose centre is within this distance (chunk units) of the
    /// viewer are activated.
    pub activation_radius: f32,
    /// Live chunks farther than this are evicted. Must exceed
    /// `activation_radius`.
    pub deactivation_radius: f32,
    pub activations_per_tick: usize,
    pub mesh_rebuilds_per_tick: usize,
    pub max_completions_per_tick: usize,
    /// Light updates per tick; 0 drains to a fixed point.
    pub max_light_updates_per_tick: usize,
    /// Save edited chunks when they are evicted and at shutdown.
    pub persist_edits: bool,
    pub seed: u64,
    pub sea_level: u32,
    pub day_length_seconds: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            activation_radius: 8.0,
            deactivation_radius: 10.0,
            activations_per_tick: 1,
            mesh_rebuilds_per_tick: 2,
            max_completions_per_tick: 16,
            max_light_updates_per_tick: 0,
            persist_edits: true,
            seed: 0,
            sea_level: 64,
            day_length_seconds: 600.0,
        }
    }
}

impl StreamingConfig {
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSettings`] describing the first
    /// inconsistent value.
    pub fn validate(&self) -> Result<(), WorldError> {
        let invalid = |msg: String| Err(WorldError::InvalidSettings(msg));
        if !self.activation_radius.is_finite() || self.activation_radius <= 0.0 {
            return invalid(format!(
                "activation radius must be positive and finite, got {}",
                self.activation_radius
            ));
        }
        if !self.deactivation_radius.is_finite()
            || self.deactivation_radius > MAX_STREAMING_RADIUS
        {
            return invalid(format!(
                "deactivation radius must be finite and at most {MAX_STREAMING_RADIUS}, got {}",
                self.deactivation_radius
            ));
        }
        if self.deactivation_radius <= self.activation_radius {
            return invalid(format!(
                "deactivation radius {} must exceed activation radius {}",
                self.deactivation_radius, self.activation_radius
            ));
        }
        if self.activations_per_tick == 0 {
            return invalid("activations_per_tick must be at least 1".into());
        }
        if self.mesh_rebuilds_per_tick == 0 {
            return invalid("mesh_rebuilds_per_tick must be at least 1".into());
        }
        if self.max_completions_per_tick == 0 {
            return invalid("max_completions_per_tick must be at least 1".into());
        }
        if !self.day_length_seconds.is_finite() || self.day_length_seconds <= 0.0 {
            return invalid(format!(
                "day length must be positive, got {}",
                self.day_length_seconds
            ));
        }
        Ok(())
    }
}

/// How background jobs are run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorKind {
    /// A [`WorkerPool`]; 0 compute threads picks a count from the CPU.
    Threaded { compute_threads: usize },
    /// Jobs run on the caller's thread at submit time.
    Inline,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one [`World::tick`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Coordinates whose generate or load job was submitted.
    pub activated: Vec<ChunkCoord>,
    pub deactivated: Option<ChunkCoord>,
    /// Whether the evicted chunk was handed to a save job.
    pub save_submitted: bool,
    /// Job outcomes applied.
    pub completions: usize,
    pub light: LightingReport,
    /// Chunks whose mesh the renderer should rebuild, nearest first.
    pub meshes: Vec<ChunkCoord>,
}

impl TickReport {
    fn is_idle(&self) -> bool {
        self.activated.is_empty()
            && self.deactivated.is_none()
            && self.completions == 0
            && self.light.processed == 0
            && self.meshes.is_empty()
    }
}

/// Snapshot of world counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub live: usize,
    pub initializing: usize,
    pub saving: usize,
    pub jobs_in_flight: usize,
    pub light_pending: usize,
    pub generated: u64,
    pub loaded: u64,
    pub saved: u64,
    pub load_failures: u64,
    pub save_failures: u64,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Owns the live chunk set and drives streaming, jobs and lighting.
pub struct World {
    config: StreamingConfig,
    registry: Arc<BlockRegistry>,
    store: Arc<dyn ChunkStore>,
    executor: Box<dyn JobExecutor>,
    live: ChunkMap,
    initializing: FxHashMap<ChunkCoord, ChunkState>,
    saving: FxHashSet<ChunkCoord>,
    lighting: LightingEngine,
    sky: SkyState,
    /// Viewer position in chunk units, from the last tick.
    viewer: Vec2,
    stats: WorldStats,
    shut_down: bool,
}

impl World {
    /// # Errors
    ///
    /// Fails if the settings are inconsistent, the registry lacks a terrain
    /// type, or a worker thread cannot be spawned.
    pub fn new(
        config: StreamingConfig,
        registry: Arc<BlockRegistry>,
        templates: Arc<TemplateRegistry>,
        store: Arc<dyn ChunkStore>,
        executor: ExecutorKind,
    ) -> Result<Self, WorldError> {
        config.validate()?;

        let staging = LightStaging::new();
        let generator = TerrainGenerator::new(
            config.seed,
            config.sea_level,
            Arc::clone(&registry),
            templates,
        )?;
        let ctx = Arc::new(JobContext {
            registry: Arc::clone(&registry),
            generator,
            store: Arc::clone(&store),
            staging: staging.clone(),
        });
        let executor: Box<dyn JobExecutor> = match executor {
            ExecutorKind::Threaded { compute_threads } => {
                let threads = if compute_threads == 0 {
                    WorkerPool::default_compute_threads()
                } else {
                    compute_threads
                };
                Box::new(WorkerPool::new(threads, ctx)?)
            }
            ExecutorKind::Inline => Box::new(InlineExecutor::new(ctx)),
        };

        tracing::info!(
            "world created: seed {}, activation radius {}, deactivation radius {}",
            config.seed,
            config.activation_radius,
            config.deactivation_radius
        );

        Ok(Self {
            sky: SkyState::new(config.day_length_seconds),
            config,
            registry,
            store,
            executor,
            live: ChunkMap::new(),
            initializing: FxHashMap::default(),
            saving: FxHashSet::default(),
            lighting: LightingEngine::new(staging),
            viewer: Vec2::ZERO,
            stats: WorldStats::default(),
            shut_down: false,
        })
    }

    /// Advances the world by one frame for a viewer at `viewer` (block
    /// units).
    pub fn tick(&mut self, viewer: Vec3, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        self.viewer = Vec2::new(
            viewer.x / CHUNK_SIZE_X as f32,
            viewer.y / CHUNK_SIZE_Y as f32,
        );
        self.sky.advance(dt);

        // --- Apply finished jobs ---
        for _ in 0..self.config.max_completions_per_tick {
            let Some(outcome) = self.executor.poll() else {
                break;
            };
            self.handle_outcome(outcome);
            report.completions += 1;
        }

        // --- Activation, then eviction only on quiet ticks ---
        report.activated = self.activate_nearest();
        if report.activated.is_empty()
            && let Some((coord, saved)) = self.deactivate_farthest()
        {
            report.deactivated = Some(coord);
            report.save_submitted = saved;
        }

        // --- Lighting ---
        let initializing = &self.initializing;
        self.lighting
            .merge_staging(&mut self.live, |coord| initializing.contains_key(&coord));
        report.light = self.lighting.propagate(
            &mut self.live,
            &self.registry,
            self.config.max_light_updates_per_tick,
        );

        report.meshes = self.schedule_meshes();

        if !report.is_idle() {
            tracing::debug!("tick: {report:?}");
        }
        report
    }

    // -- Streaming ---------------------------------------------------------

    fn is_tracked(&self, coord: ChunkCoord) -> bool {
        self.live.contains(coord)
            || self.initializing.contains_key(&coord)
            || self.saving.contains(&coord)
    }

    fn activate_nearest(&mut self) -> Vec<ChunkCoord> {
        let radius = self.config.activation_radius;
        let radius_sq = radius * radius;
        let reach = (radius.ceil() as i32).saturating_add(1);
        let center = self.viewer.floor().as_ivec2();

        let mut candidates = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let coord = ChunkCoord::new(center.x + dx, center.y + dy);
                let dist_sq = coord.distance_squared_to(self.viewer);
                if dist_sq <= radius_sq && !self.is_tracked(coord) {
                    candidates.push((dist_sq, coord));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let chosen: Vec<_> = candidates
            .into_iter()
            .take(self.config.activations_per_tick)
            .map(|(_, coord)| coord)
            .collect();
        for &coord in &chosen {
            self.submit_initial_job(coord);
        }
        chosen
    }

    /// Records the coordinate as initializing with the state of the job it is
    /// about to get, then hands the chunk to that load or generate job.
    fn submit_initial_job(&mut self, coord: ChunkCoord) {
        let mut chunk = Box::new(Chunk::new(coord));

        let (state, job) = if self.store.exists(coord) {
            chunk.set_state(ChunkState::LoadingFromDisk);
            (ChunkState::LoadingFromDisk, Job::Load(chunk))
        } else {
            chunk.set_state(ChunkState::Generating);
            (ChunkState::Generating, Job::Generate(chunk))
        };
        self.initializing.insert(coord, state);
        tracing::trace!("chunk {coord} -> {state:?}");
        self.executor.submit(job);
    }

    /// Evicts the farthest live chunk beyond the deactivation radius.
    /// Returns its coordinate and whether a save job was submitted.
    fn deactivate_farthest(&mut self) -> Option<(ChunkCoord, bool)> {
        let limit_sq = self.config.deactivation_radius * self.config.deactivation_radius;
        let viewer = self.viewer;
        let (_, coord) = self
            .live
            .coords()
            .map(|coord| (coord.distance_squared_to(viewer), coord))
            .filter(|(dist_sq, _)| *dist_sq > limit_sq)
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))?;

        let chunk = self.live.remove(coord)?;
        self.lighting.seed_edges(&mut self.live, &self.registry, coord);
        for neighbor in coord.horizontal_neighbors() {
            if let Some(chunk) = self.live.get_mut(neighbor) {
                chunk.mark_mesh_dirty();
            }
        }

        if chunk.needs_save() && self.config.persist_edits {
            self.saving.insert(coord);
            self.executor.submit(Job::Save(chunk));
            tracing::debug!("evicted chunk {coord}, saving");
            Some((coord, true))
        } else {
            tracing::trace!("evicted chunk {coord}");
            Some((coord, false))
        }
    }

    fn handle_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Generated(chunk) => {
                self.stats.generated += 1;
                self.finish_activation(chunk);
            }
            JobOutcome::Loaded(chunk) => {
                self.stats.loaded += 1;
                self.finish_activation(chunk);
            }
            JobOutcome::LoadFailed { mut chunk, error } => {
                let coord = chunk.coord();
                self.stats.load_failures += 1;
                tracing::warn!("failed to load chunk {coord}, regenerating: {error}");
                chunk.set_state(ChunkState::Generating);
                self.initializing.insert(coord, ChunkState::Generating);
                self.executor.submit(Job::Generate(chunk));
            }
            JobOutcome::Saved(coord) => {
                self.stats.saved += 1;
                self.saving.remove(&coord);
            }
            JobOutcome::SaveFailed { coord, error } => {
                self.stats.save_failures += 1;
                self.saving.remove(&coord);
                tracing::warn!("failed to save chunk {coord}, edits lost: {error}");
            }
        }
    }

    fn finish_activation(&mut self, mut chunk: Box<Chunk>) {
        let coord = chunk.coord();
        if self.initializing.remove(&coord).is_none() {
            tracing::warn!("completed chunk {coord} was not initializing");
        }
        chunk.set_state(ChunkState::Active);
        chunk.mark_mesh_dirty();
        if self.live.insert(chunk).is_some() {
            tracing::warn!("chunk {coord} activated twice, replaced the live copy");
        }

        for neighbor in coord.horizontal_neighbors() {
            if let Some(chunk) = self.live.get_mut(neighbor) {
                chunk.mark_mesh_dirty();
            }
        }
        self.lighting.seed_chunk(&mut self.live, &self.registry, coord);
    }

    /// Picks the nearest mesh-dirty chunks whose neighbours are all live and
    /// clears their flag.
    fn schedule_meshes(&mut self) -> Vec<ChunkCoord> {
        let viewer = self.viewer;
        let mut ready: Vec<_> = self
            .live
            .iter()
            .filter(|chunk| chunk.is_mesh_dirty())
            .map(Chunk::coord)
            .filter(|&coord| self.live.has_all_neighbors(coord))
            .map(|coord| (coord.distance_squared_to(viewer), coord))
            .collect();
        ready.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        ready.truncate(self.config.mesh_rebuilds_per_tick);

        ready
            .into_iter()
            .map(|(_, coord)| {
                if let Some(chunk) = self.live.get_mut(coord) {
                    chunk.clear_mesh_dirty();
                }
                coord
            })
            .collect()
    }

    // -- Queries -----------------------------------------------------------

    /// Settings the world was created with.
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Block definitions shared with the generator.
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// The live chunks.
    pub fn chunks(&self) -> &ChunkMap {
        &self.live
    }

    /// A live chunk.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.live.get(coord)
    }

    /// Whether the chunk at `coord` is active.
    pub fn is_live(&self, coord: ChunkCoord) -> bool {
        self.live.contains(coord)
    }

    /// Lifecycle state of a coordinate whose job is in flight.
    pub fn initializing_state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.initializing.get(&coord).copied()
    }

    /// Whether a generate or load job for `coord` is in flight.
    pub fn is_initializing(&self, coord: ChunkCoord) -> bool {
        self.initializing.contains_key(&coord)
    }

    /// Whether a save job for `coord` is in flight.
    pub fn is_saving(&self, coord: ChunkCoord) -> bool {
        self.saving.contains(&coord)
    }

    /// The block at a global position, if its chunk is live.
    pub fn block_at(&self, pos: IVec3) -> Option<Block> {
        BlockIterator::at_global(&self.live, pos)
            .block(&self.live)
            .copied()
    }

    /// Day cycle state.
    pub fn sky(&self) -> &SkyState {
        &self.sky
    }

    /// Mutable day cycle state, to set the time directly.
    pub fn sky_mut(&mut self) -> &mut SkyState {
        &mut self.sky
    }

    /// Current membership sizes and lifetime counters.
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            live: self.live.len(),
            initializing: self.initializing.len(),
            saving: self.saving.len(),
            jobs_in_flight: self.executor.in_flight(),
            light_pending: self.lighting.pending(),
            ..self.stats
        }
    }

    /// Casts a ray through the live chunks. See [`raycast::raycast`].
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_length: f32) -> RaycastResult {
        raycast::raycast(&self.live, &self.registry, origin, direction, max_length)
    }

    /// Moves `aabb` out of solid blocks. See
    /// [`collision::push_out_of_solids`].
    pub fn push_out_of_solids(&self, aabb: Aabb) -> PushOut {
        collision::push_out_of_solids(&self.live, &self.registry, aabb)
    }

    // -- Edits -------------------------------------------------------------

    /// Replaces the block at `pos` and relights around it. Returns the
    /// previous type, or `None` if the chunk is not live.
    pub fn set_block(&mut self, pos: IVec3, type_id: BlockTypeId) -> Option<BlockTypeId> {
        let it = BlockIterator::at_global(&self.live, pos);
        self.edit(it, type_id)
    }

    /// Removes the block a raycast hit. Returns the removed type.
    pub fn dig(&mut self, hit: &RaycastResult) -> Option<BlockTypeId> {
        if !hit.hit {
            return None;
        }
        self.edit(hit.block, BlockTypeId::AIR)
    }

    /// Places a block against the face a raycast hit. Returns the position
    /// written, or `None` when there is no face or the cell is occupied.
    pub fn place(&mut self, hit: &RaycastResult, type_id: BlockTypeId) -> Option<IVec3> {
        if !hit.hit {
            return None;
        }
        let dir = Direction::from_offset(hit.impact_normal.as_ivec3())?;
        let target = hit.block.step(&self.live, dir);
        let current = target.block(&self.live)?;
        if self.registry.is_solid(current.type_id()) {
            return None;
        }
        self.edit(target, type_id)?;
        target.global_coords()
    }

    fn edit(&mut self, it: BlockIterator, type_id: BlockTypeId) -> Option<BlockTypeId> {
        let coord = it.chunk()?;
        let chunk = self.live.get_mut(coord)?;
        if chunk.type_at(it.index()) == type_id {
            return Some(type_id);
        }
        let old = chunk.place_block(it.index(), type_id);

        self.lighting.relight_column(&mut self.live, &self.registry, it);
        for dir in Direction::HORIZONTAL {
            if it.is_at_edge(dir)
                && let Some(chunk) = self.live.get_mut(coord.neighbor(dir))
            {
                chunk.mark_mesh_dirty();
            }
        }
        tracing::trace!(
            "chunk {coord}: block {} {} -> {}",
            it.index(),
            self.registry.get(old).name,
            self.registry.get(type_id).name
        );
        Some(old)
    }

    // -- Teardown ----------------------------------------------------------

    /// Waits for every in-flight job, applies the outcomes, then saves every
    /// edited live chunk through the store. Returns the number of chunks
    /// written. Later calls do nothing.
    pub fn shutdown(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.shut_down = true;

        loop {
            self.executor.wait_idle();
            let mut handled = 0;
            while let Some(outcome) = self.executor.poll() {
                self.handle_outcome(outcome);
                handled += 1;
            }
            if handled == 0 && self.executor.in_flight() == 0 {
                break;
            }
        }

        let mut written = 0;
        if self.config.persist_edits {
            for chunk in self.live.iter_mut().filter(|chunk| chunk.needs_save()) {
                let coord = chunk.coord();
                match self.store.write(coord, &chunk.encode()) {
                    Ok(()) => {
                        chunk.mark_saved();
                        written += 1;
                    }
                    Err(err) => {
                        self.stats.save_failures += 1;
                        tracing::warn!("failed to save chunk {coord} at shutdown: {err}");
                    }
                }
            }
        }
        self.stats.saved += written as u64;
        tracing::info!(
            "world shut down: {} live chunks, {written} saved",
            self.live.len()
        );
        written
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryChunkStore;

    fn inline_world(config: StreamingConfig, store: Arc<dyn ChunkStore>) -> World {
        let registry = Arc::new(BlockRegistry::with_defaults());
        let templates = Arc::new(TemplateRegistry::with_defaults(&registry).unwrap());
        World::new(config, registry, templates, store, ExecutorKind::Inline).unwrap()
    }

    fn small_config() -> StreamingConfig {
        StreamingConfig {
            activation_radius: 1.5,
            deactivation_radius: 2.5,
            activations_per_tick: 4,
            seed: 11,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_rejects_inverted_radii() {
        let config = StreamingConfig {
            activation_radius: 5.0,
            deactivation_radius: 5.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorldError::InvalidSettings(_))));
        assert!(StreamingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite_radii() {
        for (activation_radius, deactivation_radius) in [
            (2.0, f32::NAN),
            (f32::NAN, 4.0),
            (2.0, f32::INFINITY),
            (f32::INFINITY, f32::INFINITY),
        ] {
            let config = StreamingConfig {
                activation_radius,
                deactivation_radius,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(WorldError::InvalidSettings(_))),
                "accepted radii {activation_radius}/{deactivation_radius}"
            );
        }
    }

    #[test]
    fn test_validate_caps_radii() {
        let huge = StreamingConfig {
            activation_radius: 3.0e9,
            deactivation_radius: 4.0e9,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(WorldError::InvalidSettings(_))));

        let largest = StreamingConfig {
            activation_radius: MAX_STREAMING_RADIUS - 1.0,
            deactivation_radius: MAX_STREAMING_RADIUS,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_largest_radius_ticks() {
        let mut world = inline_world(
            StreamingConfig {
                activation_radius: MAX_STREAMING_RADIUS - 1.0,
                deactivation_radius: MAX_STREAMING_RADIUS,
                activations_per_tick: 1,
                ..small_config()
            },
            Arc::new(MemoryChunkStore::new()),
        );
        let report = world.tick(Vec3::new(8.0, 8.0, 80.0), 0.016);
        assert_eq!(report.activated, vec![ChunkCoord::new(0, 0)]);
    }

    #[test]
    fn test_new_rejects_nan_deactivation_radius() {
        let registry = Arc::new(BlockRegistry::with_defaults());
        let templates = Arc::new(TemplateRegistry::with_defaults(&registry).unwrap());
        let result = World::new(
            StreamingConfig {
                deactivation_radius: f32::NAN,
                ..small_config()
            },
            registry,
            templates,
            Arc::new(MemoryChunkStore::new()),
            ExecutorKind::Inline,
        );
        assert!(matches!(result, Err(WorldError::InvalidSettings(_))));
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let config = StreamingConfig {
            max_completions_per_tick: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_first_tick_submits_nearest() {
        let mut world = inline_world(
            StreamingConfig {
                activations_per_tick: 1,
                ..small_config()
            },
            Arc::new(MemoryChunkStore::new()),
        );
        let report = world.tick(Vec3::new(8.0, 8.0, 80.0), 0.016);
        assert_eq!(report.activated, vec![ChunkCoord::new(0, 0)]);
        assert!(world.is_initializing(ChunkCoord::new(0, 0)));
        assert_eq!(
            world.initializing_state(ChunkCoord::new(0, 0)),
            Some(ChunkState::Generating)
        );

        // The inline job finished at submit; the next tick applies it.
        let report = world.tick(Vec3::new(8.0, 8.0, 80.0), 0.016);
        assert_eq!(report.completions, 1);
        assert!(world.is_live(ChunkCoord::new(0, 0)));
        assert_eq!(world.chunk(ChunkCoord::new(0, 0)).unwrap().state(), ChunkState::Active);
    }

    #[test]
    fn test_saved_chunk_is_loaded_not_generated() {
        let store = Arc::new(MemoryChunkStore::new());
        let coord = ChunkCoord::new(0, 0);
        store.write(coord, &Chunk::new(coord).encode()).unwrap();

        let mut world = inline_world(
            StreamingConfig {
                activations_per_tick: 1,
                ..small_config()
            },
            store,
        );
        world.tick(Vec3::new(8.0, 8.0, 80.0), 0.0);
        assert_eq!(world.initializing_state(coord), Some(ChunkState::LoadingFromDisk));
        world.tick(Vec3::new(8.0, 8.0, 80.0), 0.0);
        assert_eq!(world.stats().loaded, 1);
        assert_eq!(world.block_at(IVec3::new(3, 3, 10)).unwrap().type_id(), BlockTypeId::AIR);
    }

    #[test]
    fn test_corrupt_save_falls_back_to_generation() {
        let store = Arc::new(MemoryChunkStore::new());
        let coord = ChunkCoord::new(0, 0);
        store.insert_raw(coord, vec![1, 2, 3]);

        let mut world = inline_world(
            StreamingConfig {
                activations_per_tick: 1,
                ..small_config()
            },
            store,
        );
        let viewer = Vec3::new(8.0, 8.0, 80.0);
        world.tick(viewer, 0.0);
        assert_eq!(world.initializing_state(coord), Some(ChunkState::LoadingFromDisk));

        // The inline executor runs the fallback generation at resubmit, so
        // the same drain applies it.
        world.tick(viewer, 0.0);
        assert_eq!(world.stats().load_failures, 1);
        assert_eq!(world.stats().loaded, 0);
        assert!(world.is_live(coord));
        assert!(!world.is_initializing(coord));
        assert!(world.stats().generated >= 1);
    }

    #[test]
    fn test_dig_and_place_through_raycast() {
        let mut world = inline_world(small_config(), Arc::new(MemoryChunkStore::new()));
        let viewer = Vec3::new(8.0, 8.0, 120.0);
        for _ in 0..8 {
            world.tick(viewer, 0.0);
        }
        assert!(world.is_live(ChunkCoord::new(0, 0)));

        let hit = world.raycast(Vec3::new(8.5, 8.5, 126.5), Vec3::NEG_Z, 128.0);
        assert!(hit.hit);
        assert_eq!(hit.impact_normal, Vec3::Z);
        let top = hit.block.global_coords().unwrap();

        let stone = world.registry().require("cobblestone").unwrap();
        let placed = world.place(&hit, stone).unwrap();
        assert_eq!(placed, top + IVec3::Z);
        assert_eq!(world.block_at(placed).unwrap().type_id(), stone);
        assert!(world.chunk(ChunkCoord::new(0, 0)).unwrap().needs_save());

        // Placing against the same face again is blocked by the new block.
        assert_eq!(world.place(&hit, stone), None);

        let hit = world.raycast(Vec3::new(8.5, 8.5, 126.5), Vec3::NEG_Z, 128.0);
        assert_eq!(hit.block.global_coords(), Some(placed));
        assert_eq!(world.dig(&hit), Some(stone));
        assert!(world.block_at(placed).unwrap().type_id().is_air());
    }

    #[test]
    fn test_edit_outside_live_chunks_is_ignored() {
        let mut world = inline_world(small_config(), Arc::new(MemoryChunkStore::new()));
        let stone = world.registry().require("stone").unwrap();
        assert_eq!(world.set_block(IVec3::new(500, 500, 70), stone), None);
        let miss = world.raycast(Vec3::new(500.0, 500.0, 70.0), Vec3::X, 10.0);
        assert_eq!(world.dig(&miss), None);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let store = Arc::new(MemoryChunkStore::new());
        let mut world = inline_world(small_config(), store.clone());
        let viewer = Vec3::new(8.0, 8.0, 120.0);
        for _ in 0..4 {
            world.tick(viewer, 0.0);
        }
        let stone = world.registry().require("stone").unwrap();
        world.set_block(IVec3::new(2, 2, 120), stone).unwrap();

        assert_eq!(world.shutdown(), 1);
        assert_eq!(world.shutdown(), 0);
        assert!(store.exists(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_sky_advances_with_ticks() {
        let mut world = inline_world(
            StreamingConfig {
                day_length_seconds: 100.0,
                ..small_config()
            },
            Arc::new(MemoryChunkStore::new()),
        );
        let start = world.sky().time_of_day();
        world.tick(Vec3::ZERO, 10.0);
        assert!((world.sky().time_of_day() - (start + 0.1)).abs() < 1e-5);
    }
}
