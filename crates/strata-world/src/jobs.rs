//! Background work units and their results.
//!
//! A job owns the chunk it works on. The chunk travels to a worker inside the
//! [`Job`] and comes back inside the [`JobOutcome`], so the main thread never
//! shares a chunk with a worker.

use std::sync::Arc;

use strata_lighting::LightStaging;
use strata_voxel::{BlockRegistry, Chunk, ChunkCoord, local_coords};

use crate::error::{LoadError, StoreError};
use crate::generator::TerrainGenerator;
use crate::store::ChunkStore;

/// Which worker lane runs a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobAffinity {
    /// Store reads and writes.
    Disk,
    /// CPU-bound generation.
    Compute,
}

/// A unit of background work.
#[derive(Debug)]
pub enum Job {
    Generate(Box<Chunk>),
    Load(Box<Chunk>),
    Save(Box<Chunk>),
}

/// What a finished job hands back to the main thread.
#[derive(Debug)]
pub enum JobOutcome {
    Generated(Box<Chunk>),
    Loaded(Box<Chunk>),
    /// The saved copy was unreadable. The chunk is returned untouched so it
    /// can be generated instead.
    LoadFailed { chunk: Box<Chunk>, error: LoadError },
    Saved(ChunkCoord),
    /// Persistence is best-effort; the chunk is dropped either way.
    SaveFailed { coord: ChunkCoord, error: StoreError },
}

impl JobOutcome {
    /// Coordinate of the chunk the outcome is about.
    pub fn coord(&self) -> ChunkCoord {
        match self {
            JobOutcome::Generated(chunk) | JobOutcome::Loaded(chunk) => chunk.coord(),
            JobOutcome::LoadFailed { chunk, .. } => chunk.coord(),
            JobOutcome::Saved(coord) | JobOutcome::SaveFailed { coord, .. } => *coord,
        }
    }
}

/// Everything a worker needs to run any job.
pub struct JobContext {
    pub registry: Arc<BlockRegistry>,
    pub generator: TerrainGenerator,
    pub store: Arc<dyn ChunkStore>,
    pub staging: LightStaging,
}

impl Job {
    /// Lane the job runs on.
    pub fn affinity(&self) -> JobAffinity {
        match self {
            Job::Generate(_) => JobAffinity::Compute,
            Job::Load(_) | Job::Save(_) => JobAffinity::Disk,
        }
    }

    /// Coordinate of the chunk the job owns.
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Job::Generate(chunk) | Job::Load(chunk) | Job::Save(chunk) => chunk.coord(),
        }
    }

    /// Runs the job to completion on the calling thread.
    pub fn run(self, ctx: &JobContext) -> JobOutcome {
        match self {
            Job::Generate(mut chunk) => {
                ctx.generator.generate(&mut chunk, &ctx.staging);
                JobOutcome::Generated(chunk)
            }
            Job::Load(mut chunk) => match load_into(&mut chunk, ctx) {
                Ok(()) => JobOutcome::Loaded(chunk),
                Err(error) => JobOutcome::LoadFailed { chunk, error },
            },
            Job::Save(chunk) => {
                let coord = chunk.coord();
                match ctx.store.write(coord, &chunk.encode()) {
                    Ok(()) => JobOutcome::Saved(coord),
                    Err(error) => JobOutcome::SaveFailed { coord, error },
                }
            }
        }
    }
}

fn load_into(chunk: &mut Chunk, ctx: &JobContext) -> Result<(), LoadError> {
    let bytes = ctx.store.read(chunk.coord())?.ok_or(LoadError::Missing)?;
    chunk.decode_into(&bytes)?;
    chunk.derive_sky_flags(&ctx.registry);

    let emitters: Vec<_> = chunk
        .emitter_indices(&ctx.registry)
        .map(|index| chunk.local_to_global(local_coords(index)))
        .collect();
    ctx.staging.extend(emitters);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
