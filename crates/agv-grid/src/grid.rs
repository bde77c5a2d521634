//! Dense rectangular cell grid with walkability and world mapping.

use nalgebra::Point2;

use crate::cell::{Cell, CellCoord};
use crate::error::GridError;

/// A dense `width × height` grid of [`Cell`]s.
///
/// The grid bridges two coordinate systems:
///
/// - **World space**: continuous `f64` coordinates (e.g. metres)
/// - **Cell space**: discrete `i32` coordinates in `[0, width) × [0, height)`
///
/// Bounds are fixed at construction and never change; cell identity is the
/// coordinate and is stable for the grid's lifetime. Walkability and
/// traversal cost are the only mutable per-cell state.
///
/// # Example
///
/// ```
/// use agv_grid::{CellCoord, CellGrid};
/// use nalgebra::Point2;
///
/// let mut grid = CellGrid::new(10, 10, 1.0);
///
/// // All cells start walkable
/// assert!(grid.is_walkable(CellCoord::new(4, 4)));
///
/// // World points map onto cells; out-of-range points clamp to the edge
/// assert_eq!(grid.cell_at(Point2::new(4.3, 4.9)), CellCoord::new(4, 4));
/// assert_eq!(grid.cell_at(Point2::new(-2.0, 99.0)), CellCoord::new(0, 9));
///
/// grid.set_walkable(CellCoord::new(4, 4), false);
/// assert!(!grid.is_walkable(CellCoord::new(4, 4)));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellGrid {
    /// Width in cells.
    width: u32,
    /// Height in cells.
    height: u32,
    /// Size of each cell in world units.
    cell_size: f64,
    /// World-space position of the minimum corner of cell (0, 0).
    origin: Point2<f64>,
    /// Row-major cell storage (`index = y * width + x`).
    cells: Vec<Cell>,
}

impl CellGrid {
    /// Creates a grid with every cell walkable at the default cost.
    ///
    /// Non-positive `cell_size` values are clamped to a small positive
    /// value; use [`CellGrid::try_new`] for fallible construction.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: f64) -> Self {
        Self::with_origin(width, height, cell_size, Point2::origin())
    }

    /// Creates a grid whose cell (0, 0) has its minimum corner at `origin`.
    #[must_use]
    pub fn with_origin(width: u32, height: u32, cell_size: f64, origin: Point2<f64>) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let cell_size = cell_size.abs().max(f64::EPSILON);
        Self {
            width,
            height,
            cell_size,
            origin,
            cells: vec![Cell::walkable(); (width as usize) * (height as usize)],
        }
    }

    /// Attempts to create a grid, validating dimensions and cell size.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if either dimension is zero,
    /// or [`GridError::InvalidCellSize`] if `cell_size` is not positive and
    /// finite.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellGrid, GridError};
    ///
    /// assert!(CellGrid::try_new(10, 10, 1.0).is_ok());
    /// assert!(matches!(
    ///     CellGrid::try_new(0, 10, 1.0),
    ///     Err(GridError::InvalidDimensions { .. })
    /// ));
    /// assert!(matches!(
    ///     CellGrid::try_new(10, 10, 0.0),
    ///     Err(GridError::InvalidCellSize(_))
    /// ));
    /// ```
    pub fn try_new(width: u32, height: u32, cell_size: f64) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        if cell_size <= 0.0 || !cell_size.is_finite() {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        Ok(Self::new(width, height, cell_size))
    }

    /// Returns the grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Returns the world-space origin (minimum corner of cell (0, 0)).
    #[must_use]
    pub const fn origin(&self) -> &Point2<f64> {
        &self.origin
    }

    /// Returns `true` if the coordinate lies inside the grid bounds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    #[allow(clippy::cast_sign_loss)]
    const fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some((coord.y as usize) * (self.width as usize) + coord.x as usize)
        } else {
            None
        }
    }

    /// Returns the cell record at a coordinate, or `None` out of bounds.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Returns `true` if the coordinate is in bounds and walkable.
    ///
    /// Out-of-bounds coordinates are never walkable.
    #[must_use]
    pub fn is_walkable(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(|c| c.walkable)
    }

    /// Returns the traversal cost of a cell (1 for out-of-bounds queries).
    #[must_use]
    pub fn traversal_cost(&self, coord: CellCoord) -> u32 {
        self.cell(coord).map_or(1, |c| c.traversal_cost)
    }

    /// Sets a cell's walkability, returning the previous value.
    ///
    /// Returns `None` (and changes nothing) if the coordinate is out of
    /// bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellCoord, CellGrid};
    ///
    /// let mut grid = CellGrid::new(5, 5, 1.0);
    /// assert_eq!(grid.set_walkable(CellCoord::new(2, 2), false), Some(true));
    /// assert_eq!(grid.set_walkable(CellCoord::new(2, 2), true), Some(false));
    /// assert_eq!(grid.set_walkable(CellCoord::new(9, 9), false), None);
    /// ```
    pub fn set_walkable(&mut self, coord: CellCoord, walkable: bool) -> Option<bool> {
        let index = self.index(coord)?;
        let previous = self.cells[index].walkable;
        self.cells[index].walkable = walkable;
        Some(previous)
    }

    /// Sets a cell's traversal cost, returning the previous value.
    pub fn set_traversal_cost(&mut self, coord: CellCoord, cost: u32) -> Option<u32> {
        let index = self.index(coord)?;
        let previous = self.cells[index].traversal_cost;
        self.cells[index].traversal_cost = cost.max(1);
        Some(previous)
    }

    /// Maps a world-space point onto a cell coordinate.
    ///
    /// The point is floored into cell space and clamped into
    /// `[0, width) × [0, height)`; the mapping never fails.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellCoord, CellGrid};
    /// use nalgebra::Point2;
    ///
    /// let grid = CellGrid::new(10, 10, 2.0);
    /// assert_eq!(grid.cell_at(Point2::new(5.0, 0.5)), CellCoord::new(2, 0));
    /// assert_eq!(grid.cell_at(Point2::new(-3.0, 100.0)), CellCoord::new(0, 9));
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn cell_at(&self, point: Point2<f64>) -> CellCoord {
        let relative = point - self.origin;
        let x = (relative.x / self.cell_size).floor() as i64;
        let y = (relative.y / self.cell_size).floor() as i64;
        CellCoord::new(
            x.clamp(0, i64::from(self.width) - 1) as i32,
            y.clamp(0, i64::from(self.height) - 1) as i32,
        )
    }

    /// Returns the world-space centre of a cell.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellCoord, CellGrid};
    /// use approx::assert_relative_eq;
    ///
    /// let grid = CellGrid::new(10, 10, 2.0);
    /// let centre = grid.cell_to_world_center(CellCoord::new(1, 0));
    /// assert_relative_eq!(centre.x, 3.0, epsilon = 1e-10);
    /// assert_relative_eq!(centre.y, 1.0, epsilon = 1e-10);
    /// ```
    #[must_use]
    pub fn cell_to_world_center(&self, coord: CellCoord) -> Point2<f64> {
        let half = self.cell_size * 0.5;
        Point2::new(
            f64::from(coord.x).mul_add(self.cell_size, self.origin.x) + half,
            f64::from(coord.y).mul_add(self.cell_size, self.origin.y) + half,
        )
    }

    /// Returns the in-bounds axis-aligned neighbours of a cell.
    ///
    /// The order (east, west, north, south, minus any out-of-bounds
    /// entries) is stable across calls, which keeps every search over the
    /// grid deterministic. Walkability is *not* filtered here; callers
    /// decide how blocked cells are treated.
    pub fn neighbours(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        coord
            .axis_neighbours()
            .into_iter()
            .filter(|c| self.in_bounds(*c))
    }

    /// Returns an iterator over all coordinates in row-major order.
    #[allow(clippy::cast_possible_wrap)]
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let (width, height) = (self.width as i32, self.height as i32);
        (0..height).flat_map(move |y| (0..width).map(move |x| CellCoord::new(x, y)))
    }

    /// Runs `f` with the given cells temporarily marked unwalkable.
    ///
    /// Walkability of every cell in `blocks` is flipped to `false` for the
    /// duration of `f` and restored to its prior value on *every* exit
    /// path, including unwinding. Out-of-bounds entries are ignored.
    /// Sequential calls may be nested; there must be no concurrent writers.
    ///
    /// New code should prefer passing a blocked overlay to the planner
    /// directly; this scoped form exists for call sites that still expect
    /// grid-level mutation.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellCoord, CellGrid};
    ///
    /// let mut grid = CellGrid::new(5, 5, 1.0);
    /// let block = CellCoord::new(2, 2);
    ///
    /// let seen = grid.with_temporary_blocks(&[block], |g| g.is_walkable(block));
    /// assert!(!seen);
    /// assert!(grid.is_walkable(block));
    /// ```
    pub fn with_temporary_blocks<R>(
        &mut self,
        blocks: &[CellCoord],
        f: impl FnOnce(&Self) -> R,
    ) -> R {
        let guard = BlockGuard::apply(self, blocks);
        f(&*guard.grid)
    }
}

/// Restores saved walkability on drop, so temporary blocks cannot leak
/// even when the scoped closure unwinds.
struct BlockGuard<'a> {
    grid: &'a mut CellGrid,
    saved: Vec<(CellCoord, bool)>,
}

impl<'a> BlockGuard<'a> {
    fn apply(grid: &'a mut CellGrid, blocks: &[CellCoord]) -> Self {
        let mut saved = Vec::with_capacity(blocks.len());
        for &coord in blocks {
            if let Some(previous) = grid.set_walkable(coord, false) {
                saved.push((coord, previous));
            }
        }
        Self { grid, saved }
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        // Restore in reverse so overlapping entries end at their original state.
        while let Some((coord, walkable)) = self.saved.pop() {
            self.grid.set_walkable(coord, walkable);
        }
    }
}
