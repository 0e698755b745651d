//! Run-Length Encoding (RLE) for block type arrays.
//!
//! RLE compresses runs of identical block types into `(value, count)` pairs.
//! Terrain is dominated by long vertical and horizontal runs (stone, air), so
//! most chunks collapse to a few hundred runs.

use crate::block::BlockTypeId;

/// Bytes one run occupies on the wire: `value: u8` + `count: u16 LE`.
pub const RUN_BYTES: usize = 3;

/// A single RLE run: `count` consecutive occurrences of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleRun {
    /// The block type repeated by this run.
    pub value: BlockTypeId,
    /// Number of consecutive identical values (1..=65535).
    pub count: u16,
}

/// Errors that can occur during RLE decoding.
#[derive(Debug, thiserror::Error)]
pub enum RleError {
    /// Decoded length does not match expected length.
    #[error("RLE length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected number of elements.
        expected: usize,
        /// Actual number of decoded elements.
        actual: usize,
    },
    /// A run with a zero count.
    #[error("RLE run {0} has zero length")]
    EmptyRun(usize),
}

/// Encodes a sequence of block types into RLE runs.
///
/// Runs are capped at `u16::MAX` length. An empty input produces an empty output.
pub fn rle_encode(values: impl IntoIterator<Item = BlockTypeId>) -> Vec<RleRun> {
    let mut runs: Vec<RleRun> = Vec::new();
    for value in values {
        match runs.last_mut() {
            Some(run) if run.value == value && run.count < u16::MAX => run.count += 1,
            _ => runs.push(RleRun { value, count: 1 }),
        }
    }
    runs
}

/// Decodes RLE runs back into a flat type array.
///
/// Returns an error if any run is empty or the total decoded length does not
/// match `expected_len`. Lengths are checked before allocating the output.
pub fn rle_decode(runs: &[RleRun], expected_len: usize) -> Result<Vec<BlockTypeId>, RleError> {
    let mut total = 0usize;
    for (i, run) in runs.iter().enumerate() {
        if run.count == 0 {
            return Err(RleError::EmptyRun(i));
        }
        total += run.count as usize;
    }
    if total != expected_len {
        return Err(RleError::LengthMismatch {
            expected: expected_len,
            actual: total,
        });
    }

    let mut result = Vec::with_capacity(expected_len);
    for run in runs {
        result.extend(std::iter::repeat_n(run.value, run.count as usize));
    }
    Ok(result)
}

/// Appends runs to `buf`: each run is `value: u8` + `count: u16 LE`.
pub fn rle_to_bytes(runs: &[RleRun], buf: &mut Vec<u8>) {
    buf.reserve(runs.len() * RUN_BYTES);
    for run in runs {
        buf.push(run.value.0);
        buf.extend_from_slice(&run.count.to_le_bytes());
    }
}

/// Reads `run_count` runs from `data`.
///
/// The caller checks that `data` holds at least `run_count * RUN_BYTES` bytes.
pub fn rle_from_bytes(data: &[u8], run_count: usize) -> Vec<RleRun> {
    data.chunks_exact(RUN_BYTES)
        .take(run_count)
        .map(|bytes| RleRun {
            value: BlockTypeId(bytes[0]),
            count: u16::from_le_bytes([bytes[1], bytes[2]]),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
