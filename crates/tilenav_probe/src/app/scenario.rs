use tilenav::{
    AccessRequirement, ChunkKey, CollisionMask, EntityDescriptor, EntityId, GraphError, NavGrid,
    OccupancyChange, TerrainId, Tile, TileCoord,
};
use tracing::info;

const WALL_A: EntityId = EntityId(1);
const WALL_B: EntityId = EntityId(2);
const DOOR: EntityId = EntityId(3);
const MOB: EntityId = EntityId(4);
const NEVER_SPAWNED: EntityId = EntityId(999);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScenarioStep {
    Attach {
        coord: TileCoord,
        entity: EntityDescriptor,
    },
    Move {
        entity: EntityDescriptor,
        to: TileCoord,
    },
    Detach(EntityId),
    Retile(Tile),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepReport {
    pub(crate) label: &'static str,
    pub(crate) change: Option<OccupancyChange>,
    pub(crate) dirty_chunks: Vec<ChunkKey>,
}

/// Entity churn around the seam between chunk `(0, 0)` and chunk `(1, 0)`.
pub(crate) fn churn_scenario(chunk_size: u32) -> Vec<(&'static str, ScenarioStep)> {
    let seam = chunk_size as i32;
    let wall_a = EntityDescriptor::anchored(WALL_A, CollisionMask(0b0010));
    let wall_b = EntityDescriptor::anchored(WALL_B, CollisionMask(0b0100));
    let door = EntityDescriptor::door(DOOR, AccessRequirement::new(["engineering"]));
    let mob = EntityDescriptor::movable(MOB, CollisionMask(0b0001));

    vec![
        (
            "wall_a_placed",
            ScenarioStep::Attach {
                coord: TileCoord::new(seam - 1, 2),
                entity: wall_a.clone(),
            },
        ),
        (
            "wall_b_stacked",
            ScenarioStep::Attach {
                coord: TileCoord::new(seam - 1, 2),
                entity: wall_b,
            },
        ),
        (
            "door_installed",
            ScenarioStep::Attach {
                coord: TileCoord::new(seam - 1, 3),
                entity: door,
            },
        ),
        (
            "mob_spawned",
            ScenarioStep::Attach {
                coord: TileCoord::new(seam - 2, 2),
                entity: mob.clone(),
            },
        ),
        (
            "mob_crossed_seam",
            ScenarioStep::Move {
                entity: mob,
                to: TileCoord::new(seam, 2),
            },
        ),
        (
            "wall_a_pushed",
            ScenarioStep::Move {
                entity: wall_a,
                to: TileCoord::new(seam, 3),
            },
        ),
        (
            "floor_retiled",
            ScenarioStep::Retile(Tile::new(TileCoord::new(seam - 1, 4), TerrainId(3))),
        ),
        ("wall_b_removed", ScenarioStep::Detach(WALL_B)),
        ("door_removed", ScenarioStep::Detach(DOOR)),
        ("mob_despawned", ScenarioStep::Detach(MOB)),
        ("wall_a_removed", ScenarioStep::Detach(WALL_A)),
        ("ghost_removed", ScenarioStep::Detach(NEVER_SPAWNED)),
    ]
}

pub(crate) fn replay(
    grid: &mut NavGrid,
    steps: &[(&'static str, ScenarioStep)],
) -> Result<Vec<StepReport>, GraphError> {
    let mut reports = Vec::with_capacity(steps.len());
    for (label, step) in steps {
        let change = match step {
            ScenarioStep::Attach { coord, entity } => Some(grid.attach_entity(*coord, entity)?),
            ScenarioStep::Move { entity, to } => Some(grid.move_entity(entity, *to)?),
            ScenarioStep::Detach(id) => Some(grid.detach_entity(*id)),
            ScenarioStep::Retile(tile) => {
                grid.update_tile(*tile)?;
                None
            }
        };
        let dirty_chunks = grid.drain_dirty_chunks();
        info!(
            step = *label,
            previous = ?change.and_then(|change| change.previous),
            current = ?change.and_then(|change| change.current),
            dirty_chunks = ?dirty_chunks,
            tracked_entities = grid.tracked_entity_count(),
            "scenario_step"
        );
        reports.push(StepReport {
            label: *label,
            change,
            dirty_chunks,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilenav::{Direction, GraphConfig, OccupancyKind};

    fn replayed(config: GraphConfig) -> (NavGrid, Vec<StepReport>) {
        let mut grid = NavGrid::new(config).expect("grid");
        let steps = churn_scenario(grid.config().chunk_size);
        let reports = replay(&mut grid, &steps).expect("replay");
        (grid, reports)
    }

    fn report<'a>(reports: &'a [StepReport], label: &str) -> &'a StepReport {
        reports
            .iter()
            .find(|report| report.label == label)
            .expect("step present")
    }

    #[test]
    fn churn_leaves_no_tracked_entities_or_mask() {
        let (grid, reports) = replayed(GraphConfig::default());
        assert_eq!(reports.len(), 12);
        assert_eq!(grid.tracked_entity_count(), 0);
        for chunk in grid.chunks() {
            for node in chunk.nodes() {
                assert!(node.is_unoccupied(), "{} still occupied", node.coord());
                assert_eq!(node.blocked_collision_mask(), CollisionMask::EMPTY);
            }
        }
    }

    #[test]
    fn dirty_chunks_follow_traversal_changes() {
        let (_, reports) = replayed(GraphConfig::default());
        let left = ChunkKey::new(0, 0);
        let right = ChunkKey::new(1, 0);

        assert_eq!(report(&reports, "wall_a_placed").dirty_chunks, vec![left]);
        assert_eq!(report(&reports, "door_installed").dirty_chunks, vec![left]);
        assert!(report(&reports, "mob_spawned").dirty_chunks.is_empty());
        assert!(report(&reports, "mob_crossed_seam").dirty_chunks.is_empty());
        assert_eq!(report(&reports, "wall_a_pushed").dirty_chunks, vec![left, right]);
        assert_eq!(report(&reports, "floor_retiled").dirty_chunks, vec![left]);
        assert!(report(&reports, "mob_despawned").dirty_chunks.is_empty());

        let ghost = report(&reports, "ghost_removed");
        assert_eq!(ghost.change, Some(OccupancyChange::NONE));
        assert!(ghost.dirty_chunks.is_empty());
    }

    #[test]
    fn seam_neighbors_resolve_midway_through_scenario() {
        let mut grid = NavGrid::new(GraphConfig::default()).expect("grid");
        let steps = churn_scenario(grid.config().chunk_size);
        replay(&mut grid, &steps[..6]).expect("replay");

        let east = grid
            .neighbor(TileCoord::new(7, 3), Direction::East)
            .expect("east across seam");
        assert_eq!(east.occupancy_of(WALL_A), Some(OccupancyKind::Blocker));
        let wall_tile = grid.node_at(TileCoord::new(7, 2)).expect("wall tile");
        assert_eq!(wall_tile.blocked_collision_mask(), CollisionMask(0b0100));
    }

    #[test]
    fn untracked_layers_skip_collision_steps() {
        let config = GraphConfig {
            tracked_layers: CollisionMask(0b1000),
            ..GraphConfig::default()
        };
        let (_, reports) = replayed(config);
        assert_eq!(report(&reports, "wall_a_placed").change, Some(OccupancyChange::NONE));
        assert_eq!(
            report(&reports, "door_installed").change.and_then(|change| change.current),
            Some(OccupancyKind::AccessGate)
        );
    }
}
