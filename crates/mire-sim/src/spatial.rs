//! Uniform-grid spatial index for proximity queries.
//!
//! The grid partitions a bounded, origin-centered region of the XZ plane
//! into fixed-size cells; each cell holds the occupants currently inside it.
//! `query_radius` scans only the cells overlapped by the query's bounding
//! box, which keeps the expected cost proportional to local density rather
//! than world population.
//!
//! Queries may return false positives (occupants in an overlapped cell but
//! slightly beyond the radius) -- callers that need exact radius semantics
//! re-filter by true distance. They never return false negatives: an
//! occupant whose registered position is within the radius is always found.

use std::collections::HashMap;

use glam::Vec3;

use crate::component::{Component, Context, Subscriptions};
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// SpatialGrid
// ---------------------------------------------------------------------------

/// Uniform grid over `[-width/2, width/2] x [-height/2, height/2]` in the
/// XZ plane (the Y coordinate is ignored).
///
/// Positions outside the bounds clamp to the border cells, so occupants are
/// never silently dropped.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: usize,
    rows: usize,
    width: f32,
    height: f32,
    cells: Vec<Vec<EntityId>>,
    /// Occupant -> index of the cell it is currently registered in.
    index: HashMap<EntityId, usize>,
}

impl SpatialGrid {
    /// Create a grid covering `width x height` world units with square cells
    /// of `cell_size`.
    ///
    /// Cell size should be chosen so the expected occupant count per query
    /// stays small and roughly constant regardless of total population.
    ///
    /// # Panics
    ///
    /// Panics if any dimension is non-positive or non-finite.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        assert!(
            width > 0.0 && height > 0.0 && cell_size > 0.0,
            "grid dimensions must be positive, got {width}x{height} / {cell_size}"
        );
        assert!(
            width.is_finite() && height.is_finite() && cell_size.is_finite(),
            "grid dimensions must be finite"
        );
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            cols,
            rows,
            width,
            height,
            cells: vec![Vec::new(); cols * rows],
            index: HashMap::new(),
        }
    }

    /// Grid matching the original world: 2000x2000 units, 100x100 cells.
    pub fn with_default_bounds() -> Self {
        Self::new(2000.0, 2000.0, 20.0)
    }

    /// Number of registered occupants.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the grid has no occupants.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Column/row for a world position, clamped to the border.
    fn cell_coords(&self, pos: Vec3) -> (usize, usize) {
        let x = (pos.x + self.width / 2.0).clamp(0.0, self.width);
        let z = (pos.z + self.height / 2.0).clamp(0.0, self.height);
        let col = ((x / self.cell_size) as usize).min(self.cols - 1);
        let row = ((z / self.cell_size) as usize).min(self.rows - 1);
        (col, row)
    }

    fn cell_of(&self, pos: Vec3) -> usize {
        let (col, row) = self.cell_coords(pos);
        row * self.cols + col
    }

    /// Register an occupant at `pos`. Re-inserting an existing occupant
    /// moves it.
    pub fn insert(&mut self, occupant: EntityId, pos: Vec3) {
        let cell = self.cell_of(pos);
        match self.index.insert(occupant, cell) {
            Some(old) if old == cell => {}
            Some(old) => {
                self.cells[old].retain(|&e| e != occupant);
                self.cells[cell].push(occupant);
            }
            None => self.cells[cell].push(occupant),
        }
    }

    /// Deregister an occupant. Unknown occupants are a no-op.
    pub fn remove(&mut self, occupant: EntityId) {
        if let Some(cell) = self.index.remove(&occupant) {
            self.cells[cell].retain(|&e| e != occupant);
        }
    }

    /// Re-register an occupant at its new position.
    ///
    /// Cheap when the occupant stays within its current cell. An occupant
    /// that was never inserted is inserted now.
    pub fn update_position(&mut self, occupant: EntityId, new_pos: Vec3) {
        let cell = self.cell_of(new_pos);
        if self.index.get(&occupant) == Some(&cell) {
            return;
        }
        self.insert(occupant, new_pos);
    }

    /// All occupants registered in cells overlapping the `radius`-ball
    /// around `center`, in no particular order.
    ///
    /// May include occupants slightly beyond `radius` (cell granularity);
    /// never omits one within it. An empty grid yields an empty vector.
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        let radius = radius.max(0.0);
        let (min_col, min_row) = self.cell_coords(center - Vec3::new(radius, 0.0, radius));
        let (max_col, max_row) = self.cell_coords(center + Vec3::new(radius, 0.0, radius));

        let mut result = Vec::new();
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                result.extend_from_slice(&self.cells[row * self.cols + col]);
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// GridAnchor
// ---------------------------------------------------------------------------

/// Component that keeps its entity registered in the scene's spatial grid.
///
/// Registers the entity at init, re-registers it every tick its position
/// changed (registered cell staleness never exceeds one tick boundary), and
/// deregisters it when the entity is destroyed.
#[derive(Debug, Default)]
pub struct GridAnchor;

impl GridAnchor {
    pub fn new() -> Self {
        Self
    }
}

impl Component for GridAnchor {
    fn init(&mut self, ctx: &mut Context<'_>, _topics: &mut Subscriptions) {
        let id = ctx.entity_id();
        let pos = ctx.position();
        ctx.grid_mut().insert(id, pos);
    }

    fn update(&mut self, ctx: &mut Context<'_>, _dt: f32) {
        let id = ctx.entity_id();
        let pos = ctx.position();
        ctx.grid_mut().update_position(id, pos);
    }

    fn on_removed(&mut self, ctx: &mut Context<'_>) {
        let id = ctx.entity_id();
        ctx.grid_mut().remove(id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(100.0, 100.0, 10.0)
    }

    fn id(n: u32) -> EntityId {
        EntityId::new(n, 0)
    }

    #[test]
    fn query_finds_occupants_within_radius() {
        let mut g = grid();
        g.insert(id(1), Vec3::ZERO);
        g.insert(id(2), Vec3::new(5.0, 0.0, 0.0));
        g.insert(id(3), Vec3::new(0.0, 0.0, 5.0));

        let found = g.query_radius(Vec3::ZERO, 10.0);
        assert!(found.contains(&id(1)));
        assert!(found.contains(&id(2)));
        assert!(found.contains(&id(3)));
    }

    #[test]
    fn query_skips_distant_cells() {
        let mut g = grid();
        g.insert(id(1), Vec3::new(-40.0, 0.0, -40.0));
        g.insert(id(2), Vec3::new(40.0, 0.0, 40.0));

        let found = g.query_radius(Vec3::new(-40.0, 0.0, -40.0), 5.0);
        assert!(found.contains(&id(1)));
        assert!(!found.contains(&id(2)));
    }

    #[test]
    fn empty_query_returns_empty() {
        let g = grid();
        assert!(g.query_radius(Vec3::ZERO, 50.0).is_empty());
    }

    #[test]
    fn remove_deregisters() {
        let mut g = grid();
        g.insert(id(1), Vec3::ZERO);
        assert_eq!(g.len(), 1);
        g.remove(id(1));
        assert!(g.is_empty());
        assert!(g.query_radius(Vec3::ZERO, 10.0).is_empty());
        // Removing again is a no-op.
        g.remove(id(1));
    }

    #[test]
    fn update_position_moves_between_cells() {
        let mut g = grid();
        g.insert(id(1), Vec3::new(-45.0, 0.0, -45.0));
        g.update_position(id(1), Vec3::new(45.0, 0.0, 45.0));

        assert!(!g
            .query_radius(Vec3::new(-45.0, 0.0, -45.0), 5.0)
            .contains(&id(1)));
        assert!(g
            .query_radius(Vec3::new(45.0, 0.0, 45.0), 5.0)
            .contains(&id(1)));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn update_position_within_cell_is_stable() {
        let mut g = grid();
        g.insert(id(1), Vec3::new(1.0, 0.0, 1.0));
        g.update_position(id(1), Vec3::new(2.0, 0.0, 2.0));
        assert_eq!(g.len(), 1);
        assert!(g.query_radius(Vec3::new(2.0, 0.0, 2.0), 3.0).contains(&id(1)));
    }

    #[test]
    fn out_of_bounds_positions_clamp_to_border() {
        let mut g = grid();
        g.insert(id(1), Vec3::new(500.0, 0.0, 500.0));
        // Still findable when querying near the border.
        let found = g.query_radius(Vec3::new(49.0, 0.0, 49.0), 5.0);
        assert!(found.contains(&id(1)));
    }

    #[test]
    fn y_coordinate_is_ignored() {
        let mut g = grid();
        g.insert(id(1), Vec3::new(0.0, 100.0, 0.0));
        assert!(g.query_radius(Vec3::ZERO, 1.0).contains(&id(1)));
    }
}
