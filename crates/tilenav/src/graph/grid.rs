use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::config::{ConfigError, GraphConfig};
use crate::{
    ChunkKey, Classification, Direction, EntityDescriptor, EntityId, GraphError, TerrainId, Tile,
    TileCoord,
};

use super::chunk::{Chunk, ChunkLookup, Neighbors};
use super::node::{Node, OccupancyChange};

/// Sparse, open-ended set of chunks plus the index that routes entity
/// events to the tile each entity was last registered on.
#[derive(Debug)]
pub struct NavGrid {
    config: GraphConfig,
    chunks: BTreeMap<ChunkKey, Chunk>,
    entity_positions: HashMap<EntityId, TileCoord>,
}

impl ChunkLookup for NavGrid {
    fn lookup_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }
}

impl NavGrid {
    pub fn new(config: GraphConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            chunks: BTreeMap::new(),
            entity_positions: HashMap::new(),
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn chunk_key_for(&self, coord: TileCoord) -> ChunkKey {
        ChunkKey::containing(coord, self.config.chunk_size)
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn chunk_at(&self, coord: TileCoord) -> Option<&Chunk> {
        self.chunk(self.chunk_key_for(coord))
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn node_at(&self, coord: TileCoord) -> Option<&Node> {
        self.chunk_at(coord).map(|chunk| chunk.node(coord))
    }

    /// Returns the chunk holding `coord`, creating an empty one on first touch.
    /// Fails only when that chunk's footprint overhangs the coordinate range.
    pub fn ensure_chunk(&mut self, coord: TileCoord) -> Result<&mut Chunk, GraphError> {
        let key = self.chunk_key_for(coord);
        let chunk_size = self.config.chunk_size;
        match self.chunks.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let chunk = Chunk::new(key, chunk_size)?;
                debug!(chunk_x = key.x, chunk_y = key.y, chunk_size, "chunk_created");
                Ok(entry.insert(chunk))
            }
        }
    }

    /// Loads a chunk with the given terrain, replacing any chunk already at `key`.
    pub fn load_chunk(&mut self, key: ChunkKey, terrain: Vec<TerrainId>) -> Result<(), GraphError> {
        let chunk = Chunk::from_terrain(key, self.config.chunk_size, terrain)?;
        self.insert_chunk(chunk)?;
        Ok(())
    }

    /// Inserts a prebuilt chunk. Entities already registered on its nodes are
    /// indexed; entities indexed on a replaced chunk are forgotten. An entity
    /// still registered on another loaded tile is detached there, so the
    /// incoming registration is the only one left.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Result<Option<Chunk>, GraphError> {
        if chunk.size() != self.config.chunk_size {
            return Err(GraphError::ChunkSizeMismatch {
                expected: self.config.chunk_size,
                actual: chunk.size(),
            });
        }

        let key = chunk.key();
        let replaced = self.remove_chunk(key);
        let arriving: Vec<(EntityId, TileCoord)> = chunk
            .nodes()
            .iter()
            .flat_map(|node| node.tracked_entities().map(move |id| (id, node.coord())))
            .collect();
        debug!(chunk_x = key.x, chunk_y = key.y, entities = arriving.len(), "chunk_inserted");
        self.chunks.insert(key, chunk);

        for (id, coord) in arriving {
            if let Some(stale) = self.entity_positions.get(&id).copied() {
                debug!(
                    entity = id.0,
                    x = stale.x,
                    y = stale.y,
                    "stale_registration_detached"
                );
                self.detach_at(stale, id);
            }
            self.entity_positions.insert(id, coord);
        }
        Ok(replaced)
    }

    /// Unloads a chunk. Its tiles read as absent afterwards, exactly like a
    /// region that was never loaded.
    pub fn remove_chunk(&mut self, key: ChunkKey) -> Option<Chunk> {
        let chunk = self.chunks.remove(&key)?;
        let before = self.entity_positions.len();
        self.entity_positions
            .retain(|_, coord| !chunk.contains(*coord));
        debug!(
            chunk_x = key.x,
            chunk_y = key.y,
            forgotten_entities = before - self.entity_positions.len(),
            "chunk_removed"
        );
        Some(chunk)
    }

    pub fn neighbors(&self, coord: TileCoord) -> Option<Neighbors<'_>> {
        let chunk = self.chunk_at(coord)?;
        Some(chunk.neighbors(coord, self))
    }

    pub fn neighbor(&self, coord: TileCoord, direction: Direction) -> Option<&Node> {
        self.chunk_at(coord)?.neighbor(coord, direction, self)
    }

    /// Registers `entity` on the tile at `coord`. An entity tracked on a
    /// different tile is detached there first, so this doubles as a move.
    ///
    /// An entity that classifies as ignored touches no chunk: it is only
    /// detached from a previous, different tile, and that removal is returned.
    pub fn attach_entity(
        &mut self,
        coord: TileCoord,
        entity: &EntityDescriptor,
    ) -> Result<OccupancyChange, GraphError> {
        let id = entity.id;
        let tracked_layers = self.config.tracked_layers;
        let moved_from = self
            .entity_positions
            .get(&id)
            .copied()
            .filter(|previous| *previous != coord);

        if matches!(entity.classify(tracked_layers), Classification::Ignored) {
            return Ok(match moved_from {
                Some(previous) => self.detach_at(previous, id),
                None => OccupancyChange::NONE,
            });
        }

        self.ensure_chunk(coord)?;
        if let Some(previous) = moved_from {
            self.detach_at(previous, id);
        }
        let change = self
            .ensure_chunk(coord)?
            .attach_entity(coord, entity, tracked_layers);
        self.entity_positions.insert(id, coord);

        if change.previous.is_some() && change.previous != change.current {
            debug!(
                entity = id.0,
                x = coord.x,
                y = coord.y,
                previous = ?change.previous,
                current = ?change.current,
                "entity_reclassified"
            );
        }
        Ok(change)
    }

    pub fn move_entity(
        &mut self,
        entity: &EntityDescriptor,
        to: TileCoord,
    ) -> Result<OccupancyChange, GraphError> {
        let from = self.entity_positions.get(&entity.id).copied();
        trace!(entity = entity.id.0, ?from, to_x = to.x, to_y = to.y, "entity_moved");
        self.attach_entity(to, entity)
    }

    /// Removes `id` from wherever it is tracked. Unknown ids are ignored.
    pub fn detach_entity(&mut self, id: EntityId) -> OccupancyChange {
        match self.entity_positions.get(&id).copied() {
            Some(coord) => self.detach_at(coord, id),
            None => OccupancyChange::NONE,
        }
    }

    fn detach_at(&mut self, coord: TileCoord, id: EntityId) -> OccupancyChange {
        self.entity_positions.remove(&id);
        let key = self.chunk_key_for(coord);
        match self.chunks.get_mut(&key) {
            Some(chunk) => chunk.detach_entity(coord, id),
            None => OccupancyChange::NONE,
        }
    }

    pub fn entity_position(&self, id: EntityId) -> Option<TileCoord> {
        self.entity_positions.get(&id).copied()
    }

    pub fn tracked_entity_count(&self) -> usize {
        self.entity_positions.len()
    }

    pub fn update_tile(&mut self, tile: Tile) -> Result<(), GraphError> {
        self.ensure_chunk(tile.coord)?.update_tile(tile);
        Ok(())
    }

    pub fn dirty_chunks(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks
            .values()
            .filter(|chunk| chunk.is_dirty())
            .map(Chunk::key)
    }

    /// Clears every dirty flag and returns the affected keys in key order.
    pub fn drain_dirty_chunks(&mut self) -> Vec<ChunkKey> {
        let drained: Vec<ChunkKey> = self
            .chunks
            .values_mut()
            .filter_map(|chunk| chunk.take_dirty().then_some(chunk.key()))
            .collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "dirty_chunks_drained");
        }
        drained
    }
}
