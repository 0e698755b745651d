//! Block type registry: maps compact [`BlockTypeId`] values to [`BlockDefinition`] metadata.
//!
//! The registry is built once during startup and shared read-only (behind an
//! `Arc`) with the world and its worker threads. Air is always ID 0 so that a
//! freshly allocated chunk represents empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BlockTypeId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Full descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    /// Human-readable name (e.g. "stone", "water").
    pub name: String,
    /// Whether entities and raycasts collide with this block.
    pub solid: bool,
    /// Whether the block stops sky light from falling through it.
    pub opaque: bool,
    /// Whether the mesher should emit faces for this block.
    pub visible: bool,
    /// Opaque blocks that still let light diffuse through them (water, ice).
    pub translucent_to_light: bool,
    /// Indoor light emitted (0 = not an indoor emitter).
    pub indoor_emission: u8,
    /// Outdoor light emitted (0 = not an outdoor emitter).
    pub outdoor_emission: u8,
}

impl BlockDefinition {
    /// A solid, opaque, visible block with no emission.
    pub fn solid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: true,
            opaque: true,
            visible: true,
            translucent_to_light: false,
            indoor_emission: 0,
            outdoor_emission: 0,
        }
    }

    /// An invisible, non-solid block that light passes freely.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: false,
            opaque: false,
            visible: false,
            translucent_to_light: false,
            indoor_emission: 0,
            outdoor_emission: 0,
        }
    }

    /// Sets the indoor emission level.
    pub fn with_indoor_emission(mut self, level: u8) -> Self {
        self.indoor_emission = level;
        self
    }

    /// Marks the block as translucent to light.
    pub fn translucent(mut self) -> Self {
        self.translucent_to_light = true;
        self
    }

    /// Marks the block as non-solid.
    pub fn passable(mut self) -> Self {
        self.solid = false;
        self
    }

    /// Whether light propagates into this block from its neighbours.
    pub fn passes_light(&self) -> bool {
        !self.opaque || self.translucent_to_light
    }

    /// Whether the block emits on either channel.
    pub fn is_emitter(&self) -> bool {
        self.indoor_emission > 0 || self.outdoor_emission > 0
    }
}

/// Errors that can occur during block type registration or lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate block type name: {0}")]
    DuplicateName(String),
    /// All 256 slots have been consumed.
    #[error("block type registry is full (max 256 types)")]
    RegistryFull,
    /// A required type name was not registered.
    #[error("unknown block type name: {0}")]
    UnknownName(String),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockTypeId`] to [`BlockDefinition`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    /// Dense array where `index == BlockTypeId.0`.
    types: Vec<BlockDefinition>,
    name_to_id: HashMap<String, BlockTypeId>,
}

impl BlockRegistry {
    /// Creates a registry containing only air.
    pub fn new() -> Self {
        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), BlockTypeId::AIR);

        Self {
            types: vec![BlockDefinition::empty("air")],
            name_to_id,
        }
    }

    /// Creates a registry with the stock terrain palette.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            BlockDefinition::solid("stone"),
            BlockDefinition::solid("dirt"),
            BlockDefinition::solid("grass"),
            BlockDefinition::solid("sand"),
            BlockDefinition::solid("water").passable().translucent(),
            BlockDefinition::solid("ice").translucent(),
            BlockDefinition::solid("wood"),
            BlockDefinition::solid("leaves").translucent(),
            BlockDefinition::solid("glowstone").with_indoor_emission(15),
            BlockDefinition::solid("lava").passable().with_indoor_emission(14),
            BlockDefinition::solid("cobblestone"),
        ];
        for def in defaults {
            // Names are distinct and well under the slot limit.
            if let Err(err) = registry.register(def) {
                tracing::error!("default block registration failed: {err}");
            }
        }
        registry
    }

    /// Registers a new block type and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 1 (0 is air).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken, or
    /// [`RegistryError::RegistryFull`] once all 256 ids are in use.
    pub fn register(&mut self, def: BlockDefinition) -> Result<BlockTypeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u8::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockTypeId(self.types.len() as u8);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given ID.
    ///
    /// Unknown IDs (e.g. from a save written with a larger registry) resolve to
    /// air.
    pub fn get(&self, id: BlockTypeId) -> &BlockDefinition {
        self.types
            .get(id.0 as usize)
            .unwrap_or(&self.types[BlockTypeId::AIR.0 as usize])
    }

    /// Returns the ID for a named block type, or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Like [`lookup_by_name`](Self::lookup_by_name) but reports a missing
    /// name as an error.
    pub fn require(&self, name: &str) -> Result<BlockTypeId, RegistryError> {
        self.lookup_by_name(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    /// Returns the total number of registered types (including air).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Whether blocks of this type stop movement and rays.
    pub fn is_solid(&self, id: BlockTypeId) -> bool {
        self.get(id).solid
    }

    /// Whether blocks of this type block vision.
    pub fn is_opaque(&self, id: BlockTypeId) -> bool {
        self.get(id).opaque
    }

    /// Whether light propagates through blocks of this type.
    pub fn passes_light(&self, id: BlockTypeId) -> bool {
        self.get(id).passes_light()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
