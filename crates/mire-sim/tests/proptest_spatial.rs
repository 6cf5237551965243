//! Property tests for the spatial grid: no false negatives, stable
//! occupancy under moves and removals.

use glam::Vec3;
use mire_sim::entity::EntityId;
use mire_sim::spatial::SpatialGrid;
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f32> {
    // Deliberately wider than the 100x100 grid to exercise border clamping.
    -80.0f32..80.0
}

proptest! {
    /// Every occupant whose true distance to the query center is within the
    /// radius must be returned. False positives are fine; false negatives
    /// are not.
    #[test]
    fn query_radius_has_no_false_negatives(
        positions in prop::collection::vec((coord(), coord()), 1..40),
        center in (coord(), coord()),
        radius in 0.0f32..60.0,
    ) {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let occupants: Vec<(EntityId, Vec3)> = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, z))| (EntityId::new(i as u32, 0), Vec3::new(x, 0.0, z)))
            .collect();
        for &(id, pos) in &occupants {
            grid.insert(id, pos);
        }

        let found = grid.query_radius(Vec3::new(center.0, 0.0, center.1), radius);
        for &(id, pos) in &occupants {
            let dist = (pos - Vec3::new(center.0, 0.0, center.1)).length();
            if dist <= radius {
                prop_assert!(
                    found.contains(&id),
                    "occupant {id:?} at distance {dist} missing from radius-{radius} query"
                );
            }
        }
    }

    /// After an arbitrary move sequence, an occupant is found at its final
    /// position and only counted once.
    #[test]
    fn moves_never_duplicate_occupants(
        moves in prop::collection::vec((coord(), coord()), 1..20),
    ) {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let id = EntityId::new(0, 0);
        grid.insert(id, Vec3::ZERO);
        let mut last = Vec3::ZERO;
        for (x, z) in moves {
            last = Vec3::new(x, 0.0, z);
            grid.update_position(id, last);
        }
        prop_assert_eq!(grid.len(), 1);
        let found = grid.query_radius(last, 1.0);
        prop_assert_eq!(found.iter().filter(|&&e| e == id).count(), 1);
    }

    /// Insert + remove round-trips to an empty grid.
    #[test]
    fn remove_undoes_insert(
        positions in prop::collection::vec((coord(), coord()), 1..30),
    ) {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let ids: Vec<EntityId> = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, z))| {
                let id = EntityId::new(i as u32, 0);
                grid.insert(id, Vec3::new(x, 0.0, z));
                id
            })
            .collect();
        for id in ids {
            grid.remove(id);
        }
        prop_assert!(grid.is_empty());
        prop_assert!(grid.query_radius(Vec3::ZERO, 200.0).is_empty());
    }
}
