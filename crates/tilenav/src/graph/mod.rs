mod chunk;
mod grid;
mod node;

pub use chunk::{Chunk, ChunkLookup, EdgeChunks, Neighbors};
pub use grid::NavGrid;
pub use node::{generate_blocked_mask, Node, OccupancyChange};
