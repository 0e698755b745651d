//! Persistent chunk storage behind the [`ChunkStore`] trait.
//!
//! The store deals in already-encoded bytes. Encoding and decoding happen on
//! the worker threads that own the chunk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use strata_voxel::ChunkCoord;

use crate::error::StoreError;

/// Shared storage for encoded chunks, used concurrently by worker threads.
pub trait ChunkStore: Send + Sync {
    /// Whether a saved copy of the chunk exists.
    fn exists(&self, coord: ChunkCoord) -> bool;

    /// Reads the saved bytes, or `None` if the chunk was never saved.
    fn read(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the saved bytes.
    fn write(&self, coord: ChunkCoord, data: &[u8]) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

/// One file per chunk, `chunk_<x>_<y>.strata`, in a single directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// mid-write leaves the previous save intact.
#[derive(Debug)]
pub struct DiskChunkStore {
    dir: PathBuf,
}

impl DiskChunkStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        tracing::info!("chunk store at {}", dir.display());
        Ok(Self { dir })
    }

    /// Directory holding the chunk files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a chunk.
    pub fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(format!("chunk_{}_{}.strata", coord.x, coord.y))
    }
}

impl ChunkStore for DiskChunkStore {
    fn exists(&self, coord: ChunkCoord) -> bool {
        self.path_for(coord).is_file()
    }

    fn read(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(coord)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { coord, source }),
        }
    }

    fn write(&self, coord: ChunkCoord, data: &[u8]) -> Result<(), StoreError> {
        let target = self.path_for(coord);
        let tmp = target.with_extension("strata.tmp");
        let io_err = |source| StoreError::Io { coord, source };

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(data).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, &target).map_err(io_err)?;
        tracing::trace!("wrote {} bytes to {}", data.len(), target.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// In-memory store, mainly for tests and tools that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: DashMap<ChunkCoord, Vec<u8>>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Overwrites a saved chunk with arbitrary bytes.
    pub fn insert_raw(&self, coord: ChunkCoord, data: Vec<u8>) {
        self.chunks.insert(coord, data);
    }
}

impl ChunkStore for MemoryChunkStore {
    fn exists(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    fn read(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.chunks.get(&coord).map(|entry| entry.value().clone()))
    }

    fn write(&self, coord: ChunkCoord, data: &[u8]) -> Result<(), StoreError> {
        self.chunks.insert(coord, data.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskChunkStore::open(dir.path().join("saves")).unwrap();
        let coord = ChunkCoord::new(-2, 5);

        assert!(!store.exists(coord));
        assert!(store.read(coord).unwrap().is_none());

        store.write(coord, b"hello").unwrap();
        assert!(store.exists(coord));
        assert_eq!(store.read(coord).unwrap().unwrap(), b"hello");
        assert!(store.path_for(coord).ends_with("chunk_-2_5.strata"));

        store.write(coord, b"again").unwrap();
        assert_eq!(store.read(coord).unwrap().unwrap(), b"again");
        assert!(!store.path_for(coord).with_extension("strata.tmp").exists());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryChunkStore::new();
        let coord = ChunkCoord::new(1, 1);
        assert!(!store.exists(coord));
        store.write(coord, &[1, 2, 3]).unwrap();
        assert!(store.exists(coord));
        assert_eq!(store.read(coord).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let store = std::sync::Arc::new(MemoryChunkStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store.write(ChunkCoord::new(i, 0), &[i as u8]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 4);
    }
}
