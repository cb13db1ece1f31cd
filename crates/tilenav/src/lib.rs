use thiserror::Error;

pub mod config;
mod coords;
mod direction;
mod entity;
mod graph;

pub use config::{ConfigError, GraphConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use coords::{ChunkKey, TerrainId, Tile, TileCoord};
pub use direction::Direction;
pub use entity::{
    AccessRequirement, Classification, CollisionCapability, CollisionMask, DoorCapability,
    EntityDescriptor, EntityId, OccupancyKind,
};
pub use graph::{
    generate_blocked_mask, Chunk, ChunkLookup, EdgeChunks, NavGrid, Neighbors, Node,
    OccupancyChange,
};

pub const CONFIG_ENV_VAR: &str = "TILENAV_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("invalid direction index {0}; expected 0..8")]
    InvalidDirection(u8),
    #[error(
        "chunk size must be between {min} and {max}, got {size}",
        min = MIN_CHUNK_SIZE,
        max = MAX_CHUNK_SIZE
    )]
    InvalidChunkSize { size: u32 },
    #[error("terrain count mismatch: expected {expected}, got {actual}")]
    TerrainCountMismatch { expected: usize, actual: usize },
    #[error("chunk size mismatch: grid uses {expected}, chunk has {actual}")]
    ChunkSizeMismatch { expected: u32, actual: u32 },
    #[error("{key} with size {size} extends past the tile coordinate range")]
    ChunkOutOfRange { key: ChunkKey, size: u32 },
}
