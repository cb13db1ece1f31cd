use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Direction;

/// Integer world tile coordinate. `+x` is east, `+y` is north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns `None` when the offset leaves the representable coordinate range.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        self.checked_offset(dx, dy)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Position of a chunk in chunk units: tile `(x, y)` lives in chunk
/// `(floor(x / size), floor(y / size))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn containing(coord: TileCoord, chunk_size: u32) -> Self {
        let size = chunk_size as i32;
        Self {
            x: coord.x.div_euclid(size),
            y: coord.y.div_euclid(size),
        }
    }

    /// Lower-left tile of the chunk. `None` when any tile of the chunk's
    /// footprint falls outside the `i32` coordinate range.
    pub fn origin(self, chunk_size: u32) -> Option<TileCoord> {
        let size = i32::try_from(chunk_size).ok()?;
        let x = self.x.checked_mul(size)?;
        let y = self.y.checked_mul(size)?;
        let last = size.checked_sub(1)?;
        x.checked_add(last)?;
        y.checked_add(last)?;
        Some(TileCoord { x, y })
    }

    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk[{}, {}]", self.x, self.y)
    }
}

/// Terrain identity of a tile, assigned by whatever owns the tile definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

impl TerrainId {
    pub const EMPTY: TerrainId = TerrainId(0);
}

/// The world tile a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    pub terrain: TerrainId,
}

impl Tile {
    pub const fn new(coord: TileCoord, terrain: TerrainId) -> Self {
        Self { coord, terrain }
    }
}
