//! Error types for chunk storage, job execution and world construction.

use std::io;
use std::path::PathBuf;

use strata_voxel::{ChunkCodecError, ChunkCoord, RegistryError};

/// Errors from a [`ChunkStore`](crate::ChunkStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The save directory could not be created.
    #[error("failed to create save directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reading or writing one chunk failed.
    #[error("I/O error for chunk {coord}: {source}")]
    Io {
        coord: ChunkCoord,
        #[source]
        source: io::Error,
    },
}

/// Why a load job fell back to generation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt chunk data: {0}")]
    Codec(#[from] ChunkCodecError),
    /// The store reported the chunk earlier but it is gone now.
    #[error("saved chunk disappeared")]
    Missing,
}

/// Fatal errors surfaced while building a [`World`](crate::World).
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] io::Error),
    /// The block or template palette is missing a required type.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Streaming settings are inconsistent.
    #[error("invalid streaming settings: {0}")]
    InvalidSettings(String),
}
