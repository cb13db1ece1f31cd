use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Bitmask of physics collision layers.
///
/// Serialized as a plain integer. Deserialization also accepts a list of
/// layer indices, so configs can say `[0, 1, 3]` instead of `11`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const EMPTY: CollisionMask = CollisionMask(0);
    pub const ALL: CollisionMask = CollisionMask(u32::MAX);
    pub const LAYER_COUNT: u8 = 32;

    pub fn layer(index: u8) -> Option<Self> {
        if index >= Self::LAYER_COUNT {
            return None;
        }
        Some(CollisionMask(1 << index))
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersects(self, other: CollisionMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CollisionMask {
    type Output = CollisionMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        CollisionMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CollisionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

impl Serialize for CollisionMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CollisionMaskRepr {
    Bits(u32),
    Layers(Vec<u8>),
}

impl<'de> Deserialize<'de> for CollisionMask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match CollisionMaskRepr::deserialize(deserializer)? {
            CollisionMaskRepr::Bits(bits) => Ok(CollisionMask(bits)),
            CollisionMaskRepr::Layers(layers) => {
                let mut mask = CollisionMask::EMPTY;
                for index in layers {
                    mask |= CollisionMask::layer(index).ok_or_else(|| {
                        serde::de::Error::custom(format!(
                            "collision layer index {index} out of range 0..{}",
                            CollisionMask::LAYER_COUNT
                        ))
                    })?;
                }
                Ok(mask)
            }
        }
    }
}

/// Credential descriptor attached to a door by the access-control subsystem.
/// Stored on nodes as-is; nothing in this crate interprets the tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRequirement {
    tags: Vec<String>,
}

impl AccessRequirement {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorCapability {
    pub access: Option<AccessRequirement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCapability {
    pub layer: CollisionMask,
    pub anchored: bool,
}

/// What the entity/physics layer reports about an entity when it touches a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub id: EntityId,
    pub door: Option<DoorCapability>,
    pub collision: Option<CollisionCapability>,
}

/// Which occupancy set of a node an entity is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccupancyKind {
    Blocker,
    MovableOccupant,
    AccessGate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    AccessGate(AccessRequirement),
    Blocker(CollisionMask),
    MovableOccupant(CollisionMask),
    Ignored,
}

impl Classification {
    pub fn kind(&self) -> Option<OccupancyKind> {
        match self {
            Classification::AccessGate(_) => Some(OccupancyKind::AccessGate),
            Classification::Blocker(_) => Some(OccupancyKind::Blocker),
            Classification::MovableOccupant(_) => Some(OccupancyKind::MovableOccupant),
            Classification::Ignored => None,
        }
    }
}

impl EntityDescriptor {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            door: None,
            collision: None,
        }
    }

    pub fn with_door(mut self, access: Option<AccessRequirement>) -> Self {
        self.door = Some(DoorCapability { access });
        self
    }

    pub fn with_collision(mut self, layer: CollisionMask, anchored: bool) -> Self {
        self.collision = Some(CollisionCapability { layer, anchored });
        self
    }

    pub fn anchored(id: EntityId, layer: CollisionMask) -> Self {
        Self::new(id).with_collision(layer, true)
    }

    pub fn movable(id: EntityId, layer: CollisionMask) -> Self {
        Self::new(id).with_collision(layer, false)
    }

    pub fn door(id: EntityId, access: AccessRequirement) -> Self {
        Self::new(id).with_door(Some(access))
    }

    /// Door capability wins over collision. A door without an access
    /// requirement is ignored outright, even if it also collides.
    pub fn classify(&self, tracked_layers: CollisionMask) -> Classification {
        if let Some(door) = &self.door {
            return match &door.access {
                Some(access) => Classification::AccessGate(access.clone()),
                None => Classification::Ignored,
            };
        }

        match self.collision {
            Some(collision) if collision.layer.intersects(tracked_layers) => {
                if collision.anchored {
                    Classification::Blocker(collision.layer)
                } else {
                    Classification::MovableOccupant(collision.layer)
                }
            }
            _ => Classification::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACKED: CollisionMask = CollisionMask(0b0110);

    #[test]
    fn door_with_access_classifies_as_gate_even_when_colliding() {
        let access = AccessRequirement::new(["engineering"]);
        let entity = EntityDescriptor::door(EntityId(1), access.clone())
            .with_collision(CollisionMask(0b0010), true);
        assert_eq!(entity.classify(TRACKED), Classification::AccessGate(access));
    }

    #[test]
    fn door_without_access_is_ignored() {
        let entity = EntityDescriptor::new(EntityId(1))
            .with_door(None)
            .with_collision(CollisionMask(0b0010), true);
        assert_eq!(entity.classify(TRACKED), Classification::Ignored);
    }

    #[test]
    fn collision_outside_tracked_layers_is_ignored() {
        let entity = EntityDescriptor::anchored(EntityId(1), CollisionMask(0b1000));
        assert_eq!(entity.classify(TRACKED), Classification::Ignored);
        assert_eq!(
            EntityDescriptor::new(EntityId(2)).classify(TRACKED),
            Classification::Ignored
        );
    }

    #[test]
    fn anchoring_selects_blocker_or_movable() {
        let layer = CollisionMask(0b1010);
        assert_eq!(
            EntityDescriptor::anchored(EntityId(1), layer).classify(TRACKED),
            Classification::Blocker(layer)
        );
        assert_eq!(
            EntityDescriptor::movable(EntityId(1), layer).classify(TRACKED),
            Classification::MovableOccupant(layer)
        );
    }

    #[test]
    fn mask_deserializes_from_bits_or_layer_list() {
        let bits: CollisionMask = serde_json::from_str("6").expect("bits");
        let layers: CollisionMask = serde_json::from_str("[1, 2]").expect("layers");
        assert_eq!(bits, CollisionMask(0b0110));
        assert_eq!(layers, bits);
        assert!(serde_json::from_str::<CollisionMask>("[32]").is_err());
        assert_eq!(serde_json::to_string(&layers).expect("encode"), "6");
    }
}
