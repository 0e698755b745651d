//! World streaming, terrain generation, persistence and spatial queries over
//! the live chunk set.

mod collision;
mod error;
mod executor;
mod fbm;
mod generator;
mod jobs;
mod raycast;
mod seed;
mod store;
mod world;

pub use collision::{Aabb, PushOut, is_solid_at, push_out_of_solids};
pub use error::{LoadError, StoreError, WorldError};
pub use executor::{InlineExecutor, JobExecutor, WorkerPool};
pub use fbm::{FbmField, FbmParams};
pub use generator::TerrainGenerator;
pub use jobs::{Job, JobAffinity, JobContext, JobOutcome};
pub use raycast::{RaycastResult, raycast};
pub use seed::{chunk_rng, derive_chunk_seed};
pub use store::{ChunkStore, DiskChunkStore, MemoryChunkStore};
pub use world::{
    ExecutorKind, MAX_STREAMING_RADIUS, StreamingConfig, TickReport, World, WorldStats,
};
