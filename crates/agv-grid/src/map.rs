//! Map definition: the startup description of a site.
//!
//! A [`MapDefinition`] carries everything the coordination layer needs to
//! know about a site before the first agent moves: grid dimensions, blocked
//! cells, traversal costs, warehouse anchor cells, and the table that
//! resolves route-target names to world positions. How a definition is
//! produced (hand-written, loaded from a file, received over RPC) is up to
//! the caller.
//!
//! # Example
//!
//! ```
//! use agv_grid::{CellCoord, MapDefinition};
//! use nalgebra::Point2;
//!
//! let map = MapDefinition::builder(10, 10)
//!     .block(CellCoord::new(4, 4))
//!     .warehouse(CellCoord::new(7, 7))
//!     .target("Warehouse_1", Point2::new(7.5, 7.5))
//!     .build()
//!     .unwrap();
//!
//! let grid = map.build_grid();
//! assert!(!grid.is_walkable(CellCoord::new(4, 4)));
//! assert!(map.resolve_target("Warehouse_1").is_some());
//! assert!(map.resolve_target("Warehouse_99").is_none());
//! ```

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use nalgebra::Point2;

use crate::cell::CellCoord;
use crate::error::GridError;
use crate::grid::CellGrid;

/// Immutable description of a site: dimensions, walkability, costs,
/// warehouse anchors, and named route targets.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDefinition {
    width: u32,
    height: u32,
    cell_size: f64,
    origin: Point2<f64>,
    blocked: BTreeSet<CellCoord>,
    costs: BTreeMap<CellCoord, u32>,
    warehouses: BTreeSet<CellCoord>,
    targets: BTreeMap<String, Point2<f64>>,
}

impl MapDefinition {
    /// Starts building a map of the given dimensions.
    #[must_use]
    pub fn builder(width: u32, height: u32) -> MapDefinitionBuilder {
        MapDefinitionBuilder {
            width,
            height,
            cell_size: 1.0,
            origin: Point2::origin(),
            blocked: BTreeSet::new(),
            costs: BTreeMap::new(),
            warehouses: BTreeSet::new(),
            targets: BTreeMap::new(),
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Constructs the runtime grid described by this definition.
    #[must_use]
    pub fn build_grid(&self) -> CellGrid {
        let mut grid =
            CellGrid::with_origin(self.width, self.height, self.cell_size, self.origin);
        for &coord in &self.blocked {
            grid.set_walkable(coord, false);
        }
        for (&coord, &cost) in &self.costs {
            grid.set_traversal_cost(coord, cost);
        }
        grid
    }

    /// The warehouse anchor cells of this site.
    #[must_use]
    pub const fn warehouse_anchors(&self) -> &BTreeSet<CellCoord> {
        &self.warehouses
    }

    /// Resolves a route-target name to its world position.
    #[must_use]
    pub fn resolve_target(&self, name: &str) -> Option<Point2<f64>> {
        self.targets.get(name).copied()
    }

    /// The full name → world-position table.
    #[must_use]
    pub const fn targets(&self) -> &BTreeMap<String, Point2<f64>> {
        &self.targets
    }
}

/// Builder for [`MapDefinition`].
#[derive(Debug, Clone)]
pub struct MapDefinitionBuilder {
    width: u32,
    height: u32,
    cell_size: f64,
    origin: Point2<f64>,
    blocked: BTreeSet<CellCoord>,
    costs: BTreeMap<CellCoord, u32>,
    warehouses: BTreeSet<CellCoord>,
    targets: BTreeMap<String, Point2<f64>>,
}

impl MapDefinitionBuilder {
    /// Sets the cell size in world units (default 1.0).
    #[must_use]
    pub const fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Sets the world-space origin of cell (0, 0) (default the origin).
    #[must_use]
    pub const fn with_origin(mut self, origin: Point2<f64>) -> Self {
        self.origin = origin;
        self
    }

    /// Marks a cell permanently unwalkable.
    #[must_use]
    pub fn block(mut self, coord: CellCoord) -> Self {
        self.blocked.insert(coord);
        self
    }

    /// Marks every cell in the iterator unwalkable.
    #[must_use]
    pub fn block_all(mut self, coords: impl IntoIterator<Item = CellCoord>) -> Self {
        self.blocked.extend(coords);
        self
    }

    /// Sets the traversal cost of a cell (default 1).
    #[must_use]
    pub fn traversal_cost(mut self, coord: CellCoord, cost: u32) -> Self {
        self.costs.insert(coord, cost);
        self
    }

    /// Registers a warehouse anchor cell.
    #[must_use]
    pub fn warehouse(mut self, coord: CellCoord) -> Self {
        self.warehouses.insert(coord);
        self
    }

    /// Registers a named route target at a world position.
    #[must_use]
    pub fn target(mut self, name: impl Into<String>, position: Point2<f64>) -> Self {
        self.targets.insert(name.into(), position);
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] or
    /// [`GridError::InvalidCellSize`] for degenerate geometry, and
    /// [`GridError::OutOfBounds`] if a blocked, costed, or warehouse cell
    /// lies outside the grid.
    pub fn build(self) -> Result<MapDefinition, GridError> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        #[allow(clippy::cast_sign_loss)]
        let in_bounds = |coord: CellCoord| {
            coord.x >= 0
                && coord.y >= 0
                && (coord.x as u32) < self.width
                && (coord.y as u32) < self.height
        };
        for &coord in self
            .blocked
            .iter()
            .chain(self.costs.keys())
            .chain(self.warehouses.iter())
        {
            if !in_bounds(coord) {
                return Err(GridError::out_of_bounds(coord));
            }
        }
        Ok(MapDefinition {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            origin: self.origin,
            blocked: self.blocked,
            costs: self.costs,
            warehouses: self.warehouses,
            targets: self.targets,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let map = MapDefinition::builder(5, 4).build().unwrap();
        assert_eq!(map.width(), 5);
        assert_eq!(map.height(), 4);
        let grid = map.build_grid();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 4);
    }

    #[test]
    fn test_builder_applies_blocks_and_costs() {
        let map = MapDefinition::builder(5, 5)
            .block(CellCoord::new(1, 1))
            .block_all([CellCoord::new(2, 2), CellCoord::new(3, 3)])
            .traversal_cost(CellCoord::new(0, 0), 4)
            .build()
            .unwrap();
        let grid = map.build_grid();
        assert!(!grid.is_walkable(CellCoord::new(1, 1)));
        assert!(!grid.is_walkable(CellCoord::new(2, 2)));
        assert!(!grid.is_walkable(CellCoord::new(3, 3)));
        assert_eq!(grid.traversal_cost(CellCoord::new(0, 0)), 4);
    }

    #[test]
    fn test_builder_rejects_out_of_bounds() {
        let result = MapDefinition::builder(3, 3)
            .warehouse(CellCoord::new(5, 5))
            .build();
        assert!(matches!(result, Err(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_dimensions() {
        assert!(matches!(
            MapDefinition::builder(0, 3).build(),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_target_resolution() {
        let map = MapDefinition::builder(10, 10)
            .target("Warehouse_1", Point2::new(2.5, 2.5))
            .target("Depot", Point2::new(8.5, 0.5))
            .build()
            .unwrap();
        assert_eq!(
            map.resolve_target("Warehouse_1"),
            Some(Point2::new(2.5, 2.5))
        );
        assert!(map.resolve_target("nope").is_none());
        assert_eq!(map.targets().len(), 2);
    }

    #[test]
    fn test_warehouse_anchors_exposed() {
        let map = MapDefinition::builder(10, 10)
            .warehouse(CellCoord::new(5, 5))
            .warehouse(CellCoord::new(7, 2))
            .build()
            .unwrap();
        assert_eq!(map.warehouse_anchors().len(), 2);
        assert!(map.warehouse_anchors().contains(&CellCoord::new(5, 5)));
    }
}
