//! Binary encoding of a chunk's block types for persistence.
//!
//! Only block types are stored. Light and sky flags are derived state and are
//! recomputed after loading.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `"STCK"` |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 4 | Run count (`u32`, little-endian) |
//! | 9 | N×3 | Runs: `type_id: u8`, `count: u16 LE` |
//!
//! Runs cover the chunk in index order and must sum to exactly `CHUNK_VOLUME`.

use crate::chunk::{CHUNK_VOLUME, Chunk};
use crate::coords::ChunkCoord;
use crate::rle::{RUN_BYTES, RleError, rle_decode, rle_encode, rle_from_bytes, rle_to_bytes};

/// Magic bytes identifying the chunk format.
const MAGIC: [u8; 4] = *b"STCK";

/// Current format version.
const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 4 + 1 + 4;

/// Errors that can occur while decoding a chunk.
#[derive(Debug, thiserror::Error)]
pub enum ChunkCodecError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than its header claims.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// The runs do not describe exactly one chunk.
    #[error(transparent)]
    Runs(#[from] RleError),
}

impl Chunk {
    /// Encodes this chunk's block types.
    pub fn encode(&self) -> Vec<u8> {
        let runs = rle_encode(self.blocks().iter().map(|b| b.type_id()));

        let mut buf = Vec::with_capacity(HEADER_LEN + runs.len() * RUN_BYTES);
        buf.extend_from_slice(&MAGIC);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&(runs.len() as u32).to_le_bytes());
        rle_to_bytes(&runs, &mut buf);
        buf
    }

    /// Replaces this chunk's block types with decoded data.
    ///
    /// On error the chunk is left untouched. Flags and state are not changed.
    pub fn decode_into(&mut self, data: &[u8]) -> Result<(), ChunkCodecError> {
        let types = decode_types(data)?;
        for (index, type_id) in types.into_iter().enumerate() {
            self.write_type(index as u16, type_id);
        }
        Ok(())
    }

    /// Decodes a new chunk at `coord`.
    pub fn decode(coord: ChunkCoord, data: &[u8]) -> Result<Self, ChunkCodecError> {
        let mut chunk = Chunk::new(coord);
        chunk.decode_into(data)?;
        Ok(chunk)
    }
}

fn decode_types(data: &[u8]) -> Result<Vec<crate::BlockTypeId>, ChunkCodecError> {
    if data.len() < MAGIC.len() || data[..MAGIC.len()] != MAGIC {
        return Err(ChunkCodecError::InvalidMagic);
    }
    if data.len() < HEADER_LEN {
        return Err(ChunkCodecError::Truncated {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }
    let version = data[4];
    if version != FORMAT_VERSION {
        return Err(ChunkCodecError::UnsupportedVersion(version));
    }

    let run_count = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
    let expected = HEADER_LEN + run_count.saturating_mul(RUN_BYTES);
    if data.len() < expected {
        return Err(ChunkCodecError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let runs = rle_from_bytes(&data[HEADER_LEN..], run_count);
    Ok(rle_decode(&runs, CHUNK_VOLUME)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::BlockTypeId;
    use crate::chunk::local_index;

    fn assert_same_types(a: &Chunk, b: &Chunk) {
        assert!(
            a.blocks()
                .iter()
                .zip(b.blocks())
                .all(|(x, y)| x.type_id() == y.type_id())
        );
    }

    #[test]
    fn test_uniform_chunk_is_tiny() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0));
        let bytes = chunk.encode();
        // A uniform chunk is a single run.
        assert_eq!(bytes.len(), HEADER_LEN + RUN_BYTES);

        let decoded = Chunk::decode(ChunkCoord::new(0, 0), &bytes).unwrap();
        assert_same_types(&chunk, &decoded);
    }

    #[test]
    fn test_alternating_chunk_persists() {
        let mut chunk = Chunk::new(ChunkCoord::new(3, -4));
        for i in 0..CHUNK_VOLUME {
            chunk.write_type(i as u16, BlockTypeId((i % 2) as u8));
        }
        let bytes = chunk.encode();
        assert_eq!(bytes.len(), HEADER_LEN + CHUNK_VOLUME * RUN_BYTES);

        let decoded = Chunk::decode(chunk.coord(), &bytes).unwrap();
        assert_same_types(&chunk, &decoded);
    }

    #[test]
    fn test_single_anomaly_persists() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        for i in 0..CHUNK_VOLUME {
            chunk.write_type(i as u16, BlockTypeId(1));
        }
        let odd = local_index(UVec3::new(7, 11, 100));
        chunk.write_type(odd, BlockTypeId(9));

        let decoded = Chunk::decode(chunk.coord(), &chunk.encode()).unwrap();
        assert_same_types(&chunk, &decoded);
        assert_eq!(decoded.type_at(odd), BlockTypeId(9));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = Chunk::decode(ChunkCoord::default(), b"NOPE\x01\0\0\0\0").unwrap_err();
        assert!(matches!(err, ChunkCodecError::InvalidMagic));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = Chunk::new(ChunkCoord::default()).encode();
        bytes[4] = 42;
        let err = Chunk::decode(ChunkCoord::default(), &bytes).unwrap_err();
        assert!(matches!(err, ChunkCodecError::UnsupportedVersion(42)));
    }

    #[test]
    fn test_rejects_truncated_runs() {
        let mut bytes = Chunk::new(ChunkCoord::default()).encode();
        bytes.pop();
        let err = Chunk::decode(ChunkCoord::default(), &bytes).unwrap_err();
        assert!(matches!(err, ChunkCodecError::Truncated { .. }));
    }

    #[test]
    fn test_rejects_short_total() {
        let mut bytes = Vec::from(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 0x10, 0x00]);
        let err = Chunk::decode(ChunkCoord::default(), &bytes).unwrap_err();
        assert!(matches!(
            err,
            ChunkCodecError::Runs(RleError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_decode_leaves_chunk_untouched() {
        let mut chunk = Chunk::new(ChunkCoord::default());
        chunk.write_type(0, BlockTypeId(5));
        assert!(chunk.decode_into(b"garbage").is_err());
        assert_eq!(chunk.type_at(0), BlockTypeId(5));
    }
}
