//! Planned cell-by-cell paths.

use std::collections::BTreeMap;

use agv_grid::CellCoord;

use crate::agent::AgentId;

/// The committed plan: one path per agent, deterministically ordered.
///
/// `BTreeMap` iteration order is part of the determinism contract — every
/// pass over the assignments (conflict detection, scenario scoring,
/// telemetry snapshots) visits agents in the same order.
pub type Assignments = BTreeMap<AgentId, CellPath>;

/// An agent's planned future as an ordered, non-empty cell sequence.
///
/// Steps are 1-based: the cell at step `s` is the cell the agent occupies
/// at the `s`-th lockstep tick of the plan. A repeated coordinate encodes
/// a wait-in-place step.
///
/// # Example
///
/// ```
/// use agv_grid::CellCoord;
/// use agv_types::CellPath;
///
/// let path = CellPath::from_cells(vec![
///     CellCoord::new(0, 0),
///     CellCoord::new(1, 0),
///     CellCoord::new(1, 0), // wait
///     CellCoord::new(2, 0),
/// ])
/// .unwrap();
///
/// assert_eq!(path.len(), 4);
/// assert_eq!(path.step(1), Some(CellCoord::new(0, 0)));
/// assert_eq!(path.step(3), Some(CellCoord::new(1, 0)));
/// assert!(path.is_contiguous());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellPath {
    cells: Vec<CellCoord>,
}

impl CellPath {
    /// Builds a path from a cell sequence; returns `None` if it is empty.
    #[must_use]
    pub fn from_cells(cells: Vec<CellCoord>) -> Option<Self> {
        if cells.is_empty() {
            None
        } else {
            Some(Self { cells })
        }
    }

    /// A path consisting of a single cell (agent already at its target).
    #[must_use]
    pub fn single(cell: CellCoord) -> Self {
        Self { cells: vec![cell] }
    }

    /// Number of steps in the path (always ≥ 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; kept so `len`/`is_empty` pair up for clippy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The first cell of the path.
    #[must_use]
    pub fn first(&self) -> CellCoord {
        self.cells[0]
    }

    /// The final cell of the path (the current target).
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // non-empty by construction
    pub fn last(&self) -> CellCoord {
        *self.cells.last().unwrap_or(&self.cells[0])
    }

    /// The cell occupied at 1-based step `s`, if the path is that long.
    #[must_use]
    pub fn step(&self, s: u64) -> Option<CellCoord> {
        if s == 0 {
            return None;
        }
        usize::try_from(s - 1).ok().and_then(|i| self.cells.get(i)).copied()
    }

    /// The underlying cell sequence.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Iterates `(step, cell)` pairs with 1-based steps.
    pub fn steps(&self) -> impl Iterator<Item = (u64, CellCoord)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as u64 + 1, c))
    }

    /// Returns a copy of this path prefixed with `n` wait-in-place steps
    /// at its first cell.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::CellCoord;
    /// use agv_types::CellPath;
    ///
    /// let path = CellPath::from_cells(vec![
    ///     CellCoord::new(0, 0),
    ///     CellCoord::new(1, 0),
    /// ])
    /// .unwrap();
    ///
    /// let delayed = path.with_prefix_waits(2);
    /// assert_eq!(delayed.len(), 4);
    /// assert_eq!(delayed.step(3), Some(CellCoord::new(0, 0)));
    /// ```
    #[must_use]
    pub fn with_prefix_waits(&self, n: usize) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len() + n);
        cells.extend(std::iter::repeat(self.first()).take(n));
        cells.extend_from_slice(&self.cells);
        Self { cells }
    }

    /// Drops all cells before `index` (0-based), keeping at least the cell
    /// at `index` itself.
    ///
    /// Returns `false` (and leaves the path untouched) if `index` is 0 or
    /// out of range.
    pub fn trim_before(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.cells.len() {
            return false;
        }
        self.cells.drain(..index);
        true
    }

    /// Checks that consecutive cells are equal (a wait) or 4-neighbours.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.cells
            .windows(2)
            .all(|w| w[0] == w[1] || w[0].is_axis_neighbour(w[1]))
    }
}
