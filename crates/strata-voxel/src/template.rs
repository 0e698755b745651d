//! Block templates: small named structures stamped into chunks during generation.

use std::collections::HashMap;

use glam::IVec3;

use crate::block::BlockTypeId;
use crate::chunk::{CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, Chunk, local_index};
use crate::registry::{BlockRegistry, RegistryError};

/// One block of a template, relative to the template's anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplateEntry {
    pub type_id: BlockTypeId,
    pub offset: IVec3,
}

/// A named list of blocks stamped as a unit.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub name: String,
    pub entries: Vec<TemplateEntry>,
}

impl BlockTemplate {
    /// Creates an empty template.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    /// Adds a block at `offset` from the anchor.
    pub fn with(mut self, type_id: BlockTypeId, offset: IVec3) -> Self {
        self.entries.push(TemplateEntry { type_id, offset });
        self
    }

    /// Inclusive `(min, max)` offsets covered by the template.
    pub fn bounds(&self) -> (IVec3, IVec3) {
        self.entries.iter().fold(
            (IVec3::ZERO, IVec3::ZERO),
            |(min, max), e| (min.min(e.offset), max.max(e.offset)),
        )
    }

    /// Whether the whole template fits inside a chunk when anchored at `anchor`
    /// (local coordinates).
    pub fn fits_at(&self, anchor: IVec3) -> bool {
        let (min, max) = self.bounds();
        let lo = anchor + min;
        let hi = anchor + max;
        lo.cmpge(IVec3::ZERO).all()
            && hi.x < CHUNK_SIZE_X as i32
            && hi.y < CHUNK_SIZE_Y as i32
            && hi.z < CHUNK_SIZE_Z as i32
    }

    /// Writes the template into `chunk` at `anchor`, only over air. Returns
    /// `false` without writing anything if it does not fit.
    pub fn stamp(&self, chunk: &mut Chunk, anchor: IVec3) -> bool {
        if !self.fits_at(anchor) {
            return false;
        }
        for entry in &self.entries {
            let index = local_index((anchor + entry.offset).as_uvec3());
            if chunk.type_at(index).is_air() {
                chunk.write_type(index, entry.type_id);
            }
        }
        true
    }
}

/// Read-only collection of templates, looked up by name.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<BlockTemplate>,
    by_name: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Creates an empty template registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock templates built from the default block palette.
    pub fn with_defaults(blocks: &BlockRegistry) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(oak_tree(blocks)?)?;
        registry.register(boulder(blocks)?)?;
        Ok(registry)
    }

    /// Adds a template under its name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, template: BlockTemplate) -> Result<(), RegistryError> {
        if self.by_name.contains_key(&template.name) {
            return Err(RegistryError::DuplicateName(template.name));
        }
        self.by_name
            .insert(template.name.clone(), self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    /// Looks up a template by name.
    pub fn get(&self, name: &str) -> Option<&BlockTemplate> {
        self.by_name.get(name).map(|&i| &self.templates[i])
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no template is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Five-block trunk with a two-layer canopy and a cap.
fn oak_tree(blocks: &BlockRegistry) -> Result<BlockTemplate, RegistryError> {
    let wood = blocks.require("wood")?;
    let leaves = blocks.require("leaves")?;

    let mut tree = BlockTemplate::new("oak_tree");
    for z in 0..5 {
        tree = tree.with(wood, IVec3::new(0, 0, z));
    }
    for z in 3..5 {
        for x in -2i32..=2 {
            for y in -2i32..=2 {
                if (x, y) != (0, 0) && !(x.abs() == 2 && y.abs() == 2) {
                    tree = tree.with(leaves, IVec3::new(x, y, z));
                }
            }
        }
    }
    for (x, y) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
        tree = tree.with(leaves, IVec3::new(x, y, 5));
    }
    Ok(tree)
}

fn boulder(blocks: &BlockRegistry) -> Result<BlockTemplate, RegistryError> {
    let cobble = blocks.require("cobblestone")?;
    Ok(BlockTemplate::new("boulder")
        .with(cobble, IVec3::new(0, 0, 0))
        .with(cobble, IVec3::new(1, 0, 0))
        .with(cobble, IVec3::new(0, 1, 0))
        .with(cobble, IVec3::new(1, 1, 0))
        .with(cobble, IVec3::new(0, 0, 1)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
