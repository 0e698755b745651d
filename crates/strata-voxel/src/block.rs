//! The per-cell [`Block`] record: a type id plus derived lighting state.
//!
//! Light is stored as two 4-bit channels packed in a single byte. The low
//! nibble is the indoor channel (torches, glowstone, lava) and the high nibble
//! is the outdoor channel (sky). Flags occupy a second byte so the whole block
//! fits in three bytes.

use serde::{Deserialize, Serialize};

/// Maximum value of either light channel.
pub const MAX_LIGHT: u8 = 15;

const FLAG_SKY: u8 = 0b0000_0001;
const FLAG_LIGHT_DIRTY: u8 = 0b0000_0010;

/// Compact identifier of a block type, resolved through the
/// [`BlockRegistry`](crate::BlockRegistry).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockTypeId(pub u8);

impl BlockTypeId {
    /// Air is always id 0 so a zeroed chunk is empty space.
    pub const AIR: BlockTypeId = BlockTypeId(0);

    /// Returns `true` for the air type.
    pub fn is_air(self) -> bool {
        self.0 == 0
    }
}

/// One cell of a chunk.
///
/// Only `type_id` is persisted. Light and flags are recomputed after a chunk
/// is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Block {
    type_id: BlockTypeId,
    light: u8,
    flags: u8,
}

impl Block {
    /// Creates a block of the given type with no light and no flags set.
    pub const fn new(type_id: BlockTypeId) -> Self {
        Self {
            type_id,
            light: 0,
            flags: 0,
        }
    }

    /// The block's type.
    pub fn type_id(&self) -> BlockTypeId {
        self.type_id
    }

    /// Changes the type, leaving light and flags alone.
    pub fn set_type_id(&mut self, type_id: BlockTypeId) {
        self.type_id = type_id;
    }

    /// Indoor light channel (0-15).
    pub fn indoor_light(&self) -> u8 {
        self.light & 0x0F
    }

    /// Outdoor (sky) light channel (0-15).
    pub fn outdoor_light(&self) -> u8 {
        self.light >> 4
    }

    /// Sets the indoor channel, clamping to [`MAX_LIGHT`].
    pub fn set_indoor_light(&mut self, level: u8) {
        self.light = (self.light & 0xF0) | level.min(MAX_LIGHT);
    }

    /// Sets the outdoor channel, clamping to [`MAX_LIGHT`].
    pub fn set_outdoor_light(&mut self, level: u8) {
        self.light = (self.light & 0x0F) | (level.min(MAX_LIGHT) << 4);
    }

    /// Returns both channels as `(indoor, outdoor)`.
    pub fn light(&self) -> (u8, u8) {
        (self.indoor_light(), self.outdoor_light())
    }

    /// Sets both channels at once.
    pub fn set_light(&mut self, indoor: u8, outdoor: u8) {
        self.light = indoor.min(MAX_LIGHT) | (outdoor.min(MAX_LIGHT) << 4);
    }

    /// Whether this block has an unobstructed line upward to the sky.
    pub fn is_sky(&self) -> bool {
        self.flags & FLAG_SKY != 0
    }

    /// Sets or clears the open-to-sky flag.
    pub fn set_sky(&mut self, sky: bool) {
        self.set_flag(FLAG_SKY, sky);
    }

    /// Whether this block is currently queued for light recomputation.
    pub fn is_light_dirty(&self) -> bool {
        self.flags & FLAG_LIGHT_DIRTY != 0
    }

    /// Sets or clears the queued-for-relight flag.
    pub fn set_light_dirty(&mut self, dirty: bool) {
        self.set_flag(FLAG_LIGHT_DIRTY, dirty);
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_block_is_dark_air() {
        let block = Block::default();
        assert!(block.type_id().is_air());
        assert_eq!(block.light(), (0, 0));
        assert!(!block.is_sky());
        assert!(!block.is_light_dirty());
    }

    #[test]
    fn test_light_channels_are_independent() {
        let mut block = Block::new(BlockTypeId(3));
        block.set_indoor_light(7);
        block.set_outdoor_light(12);
        assert_eq!(block.indoor_light(), 7);
        assert_eq!(block.outdoor_light(), 12);

        block.set_indoor_light(0);
        assert_eq!(block.outdoor_light(), 12);
    }

    #[test]
    fn test_light_is_clamped() {
        let mut block = Block::default();
        block.set_light(200, 99);
        assert_eq!(block.light(), (MAX_LIGHT, MAX_LIGHT));
    }

    #[test]
    fn test_flags_do_not_touch_light_or_type() {
        let mut block = Block::new(BlockTypeId(9));
        block.set_light(4, 5);
        block.set_sky(true);
        block.set_light_dirty(true);
        block.set_sky(false);

        assert!(!block.is_sky());
        assert!(block.is_light_dirty());
        assert_eq!(block.light(), (4, 5));
        assert_eq!(block.type_id(), BlockTypeId(9));
    }
}
