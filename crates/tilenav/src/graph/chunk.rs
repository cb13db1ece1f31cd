use std::collections::{BTreeMap, HashMap};

use crate::config::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::{
    ChunkKey, CollisionMask, Direction, EntityDescriptor, EntityId, GraphError, TerrainId, Tile,
    TileCoord,
};

use super::node::{Node, OccupancyChange};

/// Read access to the chunks surrounding a chunk. Implemented by whatever
/// owns the chunks; a chunk never owns its neighbors.
pub trait ChunkLookup {
    fn lookup_chunk(&self, key: ChunkKey) -> Option<&Chunk>;
}

impl ChunkLookup for BTreeMap<ChunkKey, Chunk> {
    fn lookup_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.get(&key)
    }
}

impl ChunkLookup for HashMap<ChunkKey, Chunk> {
    fn lookup_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.get(&key)
    }
}

/// Up to 8 adjacent nodes, slotted by [`Direction::index`]. Directions with
/// no loaded node are `None`.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors<'a> {
    slots: [Option<&'a Node>; 8],
}

impl<'a> Neighbors<'a> {
    pub fn get(&self, direction: Direction) -> Option<&'a Node> {
        self.slots[direction.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &'a Node)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.get(direction).map(|node| (direction, node)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunks that may hold the off-chunk neighbors of one edge node, in query
/// order: horizontal side, vertical side, then the diagonal corner.
pub type EdgeChunks<'a> = [Option<&'a Chunk>; 3];

/// Fixed-size square block of nodes. Origin convention:
/// - `origin` is the world coordinate of the lower-left node.
/// - node `(x, y)` lives at index `(y - origin.y) * size + (x - origin.x)`.
#[derive(Debug, Clone)]
pub struct Chunk {
    key: ChunkKey,
    origin: TileCoord,
    size: u32,
    nodes: Vec<Node>,
    dirty: bool,
    revision: u64,
}

impl Chunk {
    pub fn new(key: ChunkKey, size: u32) -> Result<Self, GraphError> {
        let origin = footprint_origin(key, size)?;
        let count = size as usize * size as usize;
        Ok(Self::from_origin(key, origin, size, vec![TerrainId::EMPTY; count]))
    }

    /// Builds a chunk from row-major terrain ids, bottom row first.
    pub fn from_terrain(
        key: ChunkKey,
        size: u32,
        terrain: Vec<TerrainId>,
    ) -> Result<Self, GraphError> {
        let origin = footprint_origin(key, size)?;
        let expected = size as usize * size as usize;
        let actual = terrain.len();
        if expected != actual {
            return Err(GraphError::TerrainCountMismatch { expected, actual });
        }
        Ok(Self::from_origin(key, origin, size, terrain))
    }

    fn from_origin(key: ChunkKey, origin: TileCoord, size: u32, terrain: Vec<TerrainId>) -> Self {
        let nodes = terrain
            .into_iter()
            .enumerate()
            .map(|(index, terrain)| {
                let coord = coord_for_index(origin, size, index);
                Node::new(key, Tile::new(coord, terrain))
            })
            .collect();
        Self {
            key,
            origin,
            size,
            nodes,
            dirty: false,
            revision: 0,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn origin(&self) -> TileCoord {
        self.origin
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        let dx = i64::from(coord.x) - i64::from(self.origin.x);
        let dy = i64::from(coord.y) - i64::from(self.origin.y);
        let size = i64::from(self.size);
        (0..size).contains(&dx) && (0..size).contains(&dy)
    }

    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let dx = (coord.x - self.origin.x) as usize;
        let dy = (coord.y - self.origin.y) as usize;
        Some(dy * self.size as usize + dx)
    }

    pub fn get_node(&self, coord: TileCoord) -> Option<&Node> {
        self.index_of(coord).map(|index| &self.nodes[index])
    }

    /// Panics when `coord` lies outside this chunk; bounds-check with
    /// [`Chunk::contains`] first.
    pub fn node(&self, coord: TileCoord) -> &Node {
        match self.index_of(coord) {
            Some(index) => &self.nodes[index],
            None => panic!(
                "tile {coord} is outside {} (origin {}, size {})",
                self.key, self.origin, self.size
            ),
        }
    }

    fn node_mut(&mut self, coord: TileCoord) -> &mut Node {
        match self.index_of(coord) {
            Some(index) => &mut self.nodes[index],
            None => panic!(
                "tile {coord} is outside {} (origin {}, size {})",
                self.key, self.origin, self.size
            ),
        }
    }

    /// True when `coord` sits on the outer ring of this chunk.
    pub fn is_edge(&self, coord: TileCoord) -> bool {
        let (horizontal, vertical) = self.edge_sides(coord);
        horizontal.is_some() || vertical.is_some()
    }

    /// Returns `(dx, dy)` of the chunk sides `coord` touches; each is -1, +1
    /// or `None`. Chunk sizes are at least 2, so a tile never touches both
    /// opposite sides.
    fn edge_sides(&self, coord: TileCoord) -> (Option<i32>, Option<i32>) {
        let last = self.size as i32 - 1;
        let local_x = coord.x - self.origin.x;
        let local_y = coord.y - self.origin.y;
        let side = |local: i32| {
            if local == 0 {
                Some(-1)
            } else if local == last {
                Some(1)
            } else {
                None
            }
        };
        (side(local_x), side(local_y))
    }

    /// At most three neighbor chunks (only corners touch three) that could hold
    /// the off-chunk neighbors of `coord`. Interior tiles yield nothing and do
    /// not touch `lookup`.
    pub fn relevant_neighbor_chunks<'a, L>(&self, coord: TileCoord, lookup: &'a L) -> EdgeChunks<'a>
    where
        L: ChunkLookup + ?Sized,
    {
        let mut chunks: EdgeChunks<'a> = [None; 3];
        let offsets = match self.edge_sides(coord) {
            (Some(dx), Some(dy)) => [Some((dx, 0)), Some((0, dy)), Some((dx, dy))],
            (Some(dx), None) => [Some((dx, 0)), None, None],
            (None, Some(dy)) => [Some((0, dy)), None, None],
            (None, None) => return chunks,
        };
        for (slot, offset) in chunks.iter_mut().zip(offsets) {
            *slot = offset
                .and_then(|(dx, dy)| self.key.checked_offset(dx, dy))
                .and_then(|key| lookup.lookup_chunk(key));
        }
        chunks
    }

    /// All eight neighbors of the node at `coord`, resolving across chunk
    /// seams through `lookup`. If more than one candidate chunk claims a
    /// target tile, the first in [`Chunk::relevant_neighbor_chunks`] order wins.
    pub fn neighbors<'a, L>(&'a self, coord: TileCoord, lookup: &'a L) -> Neighbors<'a>
    where
        L: ChunkLookup + ?Sized,
    {
        assert!(self.contains(coord), "tile {coord} is outside {}", self.key);
        let edge_chunks = if self.is_edge(coord) {
            self.relevant_neighbor_chunks(coord, lookup)
        } else {
            [None; 3]
        };

        let mut slots = [None; 8];
        for direction in Direction::ALL {
            slots[direction.index()] = self.resolve_neighbor(coord, direction, &edge_chunks);
        }
        Neighbors { slots }
    }

    pub fn neighbor<'a, L>(
        &'a self,
        coord: TileCoord,
        direction: Direction,
        lookup: &'a L,
    ) -> Option<&'a Node>
    where
        L: ChunkLookup + ?Sized,
    {
        assert!(self.contains(coord), "tile {coord} is outside {}", self.key);
        let target = coord.step(direction)?;
        if self.contains(target) {
            return Some(self.node(target));
        }
        let edge_chunks = self.relevant_neighbor_chunks(coord, lookup);
        self.resolve_neighbor(coord, direction, &edge_chunks)
    }

    fn resolve_neighbor<'a>(
        &'a self,
        coord: TileCoord,
        direction: Direction,
        edge_chunks: &EdgeChunks<'a>,
    ) -> Option<&'a Node> {
        let target = coord.step(direction)?;
        if let Some(node) = self.get_node(target) {
            return Some(node);
        }
        edge_chunks
            .iter()
            .flatten()
            .copied()
            .find(|chunk| chunk.contains(target))
            .map(|chunk| chunk.node(target))
    }

    pub fn attach_entity(
        &mut self,
        coord: TileCoord,
        entity: &EntityDescriptor,
        tracked_layers: CollisionMask,
    ) -> OccupancyChange {
        let change = self.node_mut(coord).attach(entity, tracked_layers);
        if change.dirtied {
            self.mark_dirty();
        }
        change
    }

    pub fn detach_entity(&mut self, coord: TileCoord, id: EntityId) -> OccupancyChange {
        let change = self.node_mut(coord).detach(id);
        if change.dirtied {
            self.mark_dirty();
        }
        change
    }

    pub fn update_tile(&mut self, tile: Tile) {
        self.node_mut(tile.coord).set_tile(tile);
        self.mark_dirty();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reads and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Number of dirtying changes since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn footprint_origin(key: ChunkKey, size: u32) -> Result<TileCoord, GraphError> {
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size) {
        return Err(GraphError::InvalidChunkSize { size });
    }
    key.origin(size).ok_or(GraphError::ChunkOutOfRange { key, size })
}

fn coord_for_index(origin: TileCoord, size: u32, index: usize) -> TileCoord {
    let size = size as usize;
    TileCoord {
        x: origin.x + (index % size) as i32,
        y: origin.y + (index / size) as i32,
    }
}
