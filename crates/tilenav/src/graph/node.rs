use std::collections::BTreeMap;

use crate::{
    AccessRequirement, ChunkKey, Classification, CollisionMask, EntityDescriptor, EntityId,
    OccupancyKind, Tile, TileCoord,
};

/// Outcome of an attach or detach on a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyChange {
    pub previous: Option<OccupancyKind>,
    pub current: Option<OccupancyKind>,
    /// Traversal-relevant state changed; the owning chunk must be marked dirty.
    pub dirtied: bool,
}

impl OccupancyChange {
    pub const NONE: OccupancyChange = OccupancyChange {
        previous: None,
        current: None,
        dirtied: false,
    };

    fn unchanged(kind: OccupancyKind) -> Self {
        Self {
            previous: Some(kind),
            current: Some(kind),
            dirtied: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.dirtied && self.previous == self.current
    }
}

/// Graph vertex for one tile. Owned by exactly one chunk; mutated only
/// through that chunk so the dirty signal cannot be skipped.
#[derive(Debug, Clone)]
pub struct Node {
    tile: Tile,
    chunk: ChunkKey,
    blocked_collision_mask: CollisionMask,
    blockers: BTreeMap<EntityId, CollisionMask>,
    movable_occupants: BTreeMap<EntityId, CollisionMask>,
    access_gates: BTreeMap<EntityId, AccessRequirement>,
}

impl Node {
    pub(crate) fn new(chunk: ChunkKey, tile: Tile) -> Self {
        Self {
            tile,
            chunk,
            blocked_collision_mask: CollisionMask::EMPTY,
            blockers: BTreeMap::new(),
            movable_occupants: BTreeMap::new(),
            access_gates: BTreeMap::new(),
        }
    }

    pub fn tile(&self) -> Tile {
        self.tile
    }

    pub fn coord(&self) -> TileCoord {
        self.tile.coord
    }

    pub fn chunk_key(&self) -> ChunkKey {
        self.chunk
    }

    pub fn blocked_collision_mask(&self) -> CollisionMask {
        self.blocked_collision_mask
    }

    pub fn blockers(&self) -> &BTreeMap<EntityId, CollisionMask> {
        &self.blockers
    }

    pub fn movable_occupants(&self) -> &BTreeMap<EntityId, CollisionMask> {
        &self.movable_occupants
    }

    pub fn access_gates(&self) -> &BTreeMap<EntityId, AccessRequirement> {
        &self.access_gates
    }

    pub fn occupancy_of(&self, id: EntityId) -> Option<OccupancyKind> {
        if self.movable_occupants.contains_key(&id) {
            Some(OccupancyKind::MovableOccupant)
        } else if self.access_gates.contains_key(&id) {
            Some(OccupancyKind::AccessGate)
        } else if self.blockers.contains_key(&id) {
            Some(OccupancyKind::Blocker)
        } else {
            None
        }
    }

    pub fn is_unoccupied(&self) -> bool {
        self.blockers.is_empty() && self.movable_occupants.is_empty() && self.access_gates.is_empty()
    }

    /// Every entity registered on this node, in id order within each set.
    pub fn tracked_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.blockers
            .keys()
            .chain(self.movable_occupants.keys())
            .chain(self.access_gates.keys())
            .copied()
    }

    pub(crate) fn attach(
        &mut self,
        entity: &EntityDescriptor,
        tracked_layers: CollisionMask,
    ) -> OccupancyChange {
        let id = entity.id;
        match entity.classify(tracked_layers) {
            Classification::AccessGate(access) => {
                if self.access_gates.contains_key(&id) {
                    return OccupancyChange::unchanged(OccupancyKind::AccessGate);
                }
                let removed = self.detach(id);
                self.access_gates.insert(id, access);
                OccupancyChange {
                    previous: removed.previous,
                    current: Some(OccupancyKind::AccessGate),
                    dirtied: true,
                }
            }
            Classification::Blocker(layer) => {
                if self.blockers.get(&id) == Some(&layer) {
                    return OccupancyChange::unchanged(OccupancyKind::Blocker);
                }
                let removed = self.detach(id);
                self.blockers.insert(id, layer);
                self.regenerate_mask();
                OccupancyChange {
                    previous: removed.previous,
                    current: Some(OccupancyKind::Blocker),
                    dirtied: true,
                }
            }
            Classification::MovableOccupant(layer) => {
                if self.movable_occupants.get(&id) == Some(&layer) {
                    return OccupancyChange::unchanged(OccupancyKind::MovableOccupant);
                }
                let removed = self.detach(id);
                self.movable_occupants.insert(id, layer);
                OccupancyChange {
                    previous: removed.previous,
                    current: Some(OccupancyKind::MovableOccupant),
                    dirtied: removed.dirtied,
                }
            }
            Classification::Ignored => OccupancyChange::NONE,
        }
    }

    /// Identity-only removal; the entity may already be gone from the world,
    /// so no capability is consulted.
    pub(crate) fn detach(&mut self, id: EntityId) -> OccupancyChange {
        if self.movable_occupants.remove(&id).is_some() {
            return OccupancyChange {
                previous: Some(OccupancyKind::MovableOccupant),
                current: None,
                dirtied: false,
            };
        }

        if self.access_gates.remove(&id).is_some() {
            return OccupancyChange {
                previous: Some(OccupancyKind::AccessGate),
                current: None,
                dirtied: true,
            };
        }

        if self.blockers.remove(&id).is_some() {
            self.regenerate_mask();
            return OccupancyChange {
                previous: Some(OccupancyKind::Blocker),
                current: None,
                dirtied: true,
            };
        }

        OccupancyChange::NONE
    }

    pub(crate) fn set_tile(&mut self, tile: Tile) {
        debug_assert_eq!(tile.coord, self.tile.coord, "tile replaced with a different coordinate");
        self.tile = tile;
    }

    fn regenerate_mask(&mut self) {
        self.blocked_collision_mask = generate_blocked_mask(&self.blockers);
    }
}

/// Always a full fold over the blocker set, never an incremental update.
pub fn generate_blocked_mask(blockers: &BTreeMap<EntityId, CollisionMask>) -> CollisionMask {
    blockers
        .values()
        .fold(CollisionMask::EMPTY, |mask, layer| mask | *layer)
}
