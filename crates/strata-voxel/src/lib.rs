//! Block storage, chunk addressing and navigation, block registries and the chunk codec.

pub mod block;
pub mod chunk;
pub mod chunk_map;
pub mod chunk_serial;
pub mod coords;
pub mod iterator;
pub mod registry;
pub mod rle;
pub mod template;

pub use block::{Block, BlockTypeId, MAX_LIGHT};
pub use chunk::{
    BlockIndex, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, CHUNK_VOLUME, Chunk, ChunkState,
    local_coords, local_index,
};
pub use chunk_map::ChunkMap;
pub use chunk_serial::ChunkCodecError;
pub use coords::{ChunkCoord, Direction};
pub use iterator::BlockIterator;
pub use registry::{BlockDefinition, BlockRegistry, RegistryError};
pub use template::{BlockTemplate, TemplateEntry, TemplateRegistry};
