//! Deterministic A* search on a cell grid.
//!
//! The search is 4-connected, honours a transient blocked overlay without
//! mutating the grid, and is bounded by a configurable expansion cap.
//!
//! # Example
//!
//! ```
//! use agv_grid::{CellCoord, CellGrid};
//! use agv_pathfind::GridAStar;
//! use agv_types::PlannerConfig;
//! use hashbrown::HashSet;
//!
//! let grid = CellGrid::new(10, 10, 1.0);
//! let planner = GridAStar::new(&grid, PlannerConfig::default());
//!
//! let path = planner
//!     .find(CellCoord::new(0, 0), CellCoord::new(3, 0), &HashSet::new())
//!     .unwrap();
//! assert_eq!(path.len(), 4);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use agv_grid::{CellCoord, CellGrid};
use agv_types::{CellPath, PlannerConfig, PlanningError};

use crate::heuristics::{move_cost, step_heuristic};

/// An open-set entry. Ordered as a min-heap on `(f, h, seq)`: lowest
/// estimated total first, lower heuristic on ties, then insertion order —
/// which makes the expansion sequence fully deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: u64,
    h: u64,
    seq: u64,
    coord: CellCoord,
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the smallest key.
        (other.f, other.h, other.seq).cmp(&(self.f, self.h, self.seq))
    }
}

/// A* pathfinder over a borrowed [`CellGrid`].
///
/// The planner is pure: it never mutates the grid, and transient blocks
/// are passed per call as an overlay set.
pub struct GridAStar<'a> {
    grid: &'a CellGrid,
    config: PlannerConfig,
}

impl<'a> GridAStar<'a> {
    /// Creates a planner for the given grid and configuration.
    #[must_use]
    pub const fn new(grid: &'a CellGrid, config: PlannerConfig) -> Self {
        Self { grid, config }
    }

    /// Returns the planner configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn is_open(&self, coord: CellCoord, blocked: &HashSet<CellCoord>) -> bool {
        self.grid.is_walkable(coord) && !blocked.contains(&coord)
    }

    /// Finds the cheapest 4-connected path from `start` to `goal`,
    /// treating every cell in `blocked` as unwalkable.
    ///
    /// # Errors
    ///
    /// - [`PlanningError::StartBlocked`] / [`PlanningError::GoalBlocked`]
    ///   when an endpoint is unwalkable or in the overlay
    /// - [`PlanningError::NoPathFound`] when the free space is disconnected
    /// - [`PlanningError::SearchExhausted`] when the expansion cap is hit
    ///
    /// # Example
    ///
    /// ```
    /// use agv_grid::{CellCoord, CellGrid};
    /// use agv_pathfind::GridAStar;
    /// use agv_types::PlannerConfig;
    /// use hashbrown::HashSet;
    ///
    /// let grid = CellGrid::new(5, 5, 1.0);
    /// let planner = GridAStar::new(&grid, PlannerConfig::default());
    ///
    /// // Block the direct route; the path detours around it
    /// let blocked: HashSet<_> = [CellCoord::new(1, 0)].into_iter().collect();
    /// let path = planner
    ///     .find(CellCoord::new(0, 0), CellCoord::new(2, 0), &blocked)
    ///     .unwrap();
    /// assert_eq!(path.len(), 5);
    /// assert!(!path.cells().contains(&CellCoord::new(1, 0)));
    /// ```
    pub fn find(
        &self,
        start: CellCoord,
        goal: CellCoord,
        blocked: &HashSet<CellCoord>,
    ) -> Result<CellPath, PlanningError> {
        if !self.is_open(start, blocked) {
            return Err(PlanningError::StartBlocked(start));
        }
        if !self.is_open(goal, blocked) {
            return Err(PlanningError::GoalBlocked(goal));
        }
        if start == goal {
            return Ok(CellPath::single(start));
        }

        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<CellCoord, u64> = HashMap::new();
        let mut parent: HashMap<CellCoord, CellCoord> = HashMap::new();
        let mut seq: u64 = 0;

        g_score.insert(start, 0);
        open.push(OpenEntry {
            f: step_heuristic(start, goal),
            h: step_heuristic(start, goal),
            seq,
            coord: start,
        });

        let mut expansions: usize = 0;
        while let Some(entry) = open.pop() {
            let current = entry.coord;
            let current_g = entry.f - entry.h;

            // Stale entry: a cheaper route to this cell was found after
            // this one was pushed.
            if g_score.get(&current).copied().unwrap_or(u64::MAX) < current_g {
                continue;
            }

            if current == goal {
                return Ok(retrace(&parent, start, goal));
            }

            expansions += 1;
            if expansions >= self.config.max_expansions() {
                debug!(
                    expansions,
                    ?start,
                    ?goal,
                    "search hit its expansion cap"
                );
                return Err(PlanningError::SearchExhausted { expansions });
            }

            for neighbour in self.grid.neighbours(current) {
                if !self.is_open(neighbour, blocked) {
                    continue;
                }
                let tentative = current_g + move_cost(self.grid.traversal_cost(neighbour));
                if tentative < g_score.get(&neighbour).copied().unwrap_or(u64::MAX) {
                    g_score.insert(neighbour, tentative);
                    parent.insert(neighbour, current);
                    let h = step_heuristic(neighbour, goal);
                    seq += 1;
                    open.push(OpenEntry {
                        f: tentative + h,
                        h,
                        seq,
                        coord: neighbour,
                    });
                }
            }
        }

        Err(PlanningError::NoPathFound { start, goal })
    }
}

/// Walks parent pointers goal → start, then reverses.
fn retrace(parent: &HashMap<CellCoord, CellCoord>, start: CellCoord, goal: CellCoord) -> CellPath {
    let mut cells = vec![goal];
    let mut current = goal;
    while current != start {
        match parent.get(&current) {
            Some(&prev) => {
                cells.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    cells.reverse();
    CellPath::from_cells(cells).unwrap_or_else(|| CellPath::single(start))
}

/// Convenience function for one-off searches.
///
/// # Errors
///
/// Same failure modes as [`GridAStar::find`].
///
/// # Example
///
/// ```
/// use agv_grid::{CellCoord, CellGrid};
/// use agv_pathfind::find_path;
/// use agv_types::PlannerConfig;
/// use hashbrown::HashSet;
///
/// let grid = CellGrid::new(10, 10, 1.0);
/// let path = find_path(
///     &grid,
///     CellCoord::new(0, 0),
///     CellCoord::new(0, 9),
///     &HashSet::new(),
///     &PlannerConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(path.len(), 10);
/// ```
pub fn find_path(
    grid: &CellGrid,
    start: CellCoord,
    goal: CellCoord,
    blocked: &HashSet<CellCoord>,
    config: &PlannerConfig,
) -> Result<CellPath, PlanningError> {
    GridAStar::new(grid, config.clone()).find(start, goal, blocked)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_grid() -> CellGrid {
        CellGrid::new(10, 10, 1.0)
    }

    fn no_blocks() -> HashSet<CellCoord> {
        HashSet::new()
    }

    #[test]
    fn test_straight_line() {
        let grid = empty_grid();
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let path = planner
            .find(CellCoord::new(0, 0), CellCoord::new(5, 0), &no_blocks())
            .unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), CellCoord::new(0, 0));
        assert_eq!(path.last(), CellCoord::new(5, 0));
        assert!(path.is_contiguous());
    }

    #[test]
    fn test_trivial_path() {
        let grid = empty_grid();
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let coord = CellCoord::new(4, 4);
        let path = planner.find(coord, coord, &no_blocks()).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_l_shaped_path_is_optimal() {
        let grid = empty_grid();
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let path = planner
            .find(CellCoord::new(0, 0), CellCoord::new(3, 4), &no_blocks())
            .unwrap();
        // Optimal length on a 4-connected grid is Manhattan + 1 cells.
        assert_eq!(path.len(), 8);
        assert!(path.is_contiguous());
    }

    #[test]
    fn test_detour_around_wall() {
        let mut grid = empty_grid();
        // Wall across x=5 with a gap at y=9
        for y in 0..9 {
            grid.set_walkable(CellCoord::new(5, y), false);
        }
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let path = planner
            .find(CellCoord::new(0, 0), CellCoord::new(9, 0), &no_blocks())
            .unwrap();
        assert!(path.cells().contains(&CellCoord::new(5, 9)));
        assert!(path.len() > 10);
        assert!(path.is_contiguous());
    }

    #[test]
    fn test_blocked_overlay_not_grid_mutation() {
        let grid = empty_grid();
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let blocked: HashSet<_> = [CellCoord::new(1, 0), CellCoord::new(0, 1)]
            .into_iter()
            .collect();
        let result = planner.find(CellCoord::new(0, 0), CellCoord::new(2, 0), &blocked);
        // Start is boxed in by the overlay
        assert!(matches!(result, Err(PlanningError::NoPathFound { .. })));
        // The grid itself was never touched
        assert!(grid.is_walkable(CellCoord::new(1, 0)));
    }

    #[test]
    fn test_start_and_goal_blocked() {
        let mut grid = empty_grid();
        grid.set_walkable(CellCoord::new(0, 0), false);
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        assert!(matches!(
            planner.find(CellCoord::new(0, 0), CellCoord::new(5, 0), &no_blocks()),
            Err(PlanningError::StartBlocked(_))
        ));

        let overlay: HashSet<_> = [CellCoord::new(5, 0)].into_iter().collect();
        assert!(matches!(
            planner.find(CellCoord::new(1, 0), CellCoord::new(5, 0), &overlay),
            Err(PlanningError::GoalBlocked(_))
        ));
    }

    #[test]
    fn test_no_path_when_disconnected() {
        let mut grid = empty_grid();
        for y in 0..10 {
            grid.set_walkable(CellCoord::new(4, y), false);
        }
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let result = planner.find(CellCoord::new(0, 0), CellCoord::new(9, 0), &no_blocks());
        assert!(matches!(result, Err(PlanningError::NoPathFound { .. })));
    }

    #[test]
    fn test_expansion_cap() {
        let grid = CellGrid::new(100, 100, 1.0);
        let planner = GridAStar::new(&grid, PlannerConfig::default().with_max_expansions(10));
        let result = planner.find(CellCoord::new(0, 0), CellCoord::new(99, 99), &no_blocks());
        assert!(matches!(
            result,
            Err(PlanningError::SearchExhausted { .. })
        ));
    }

    #[test]
    fn test_traversal_cost_steers_the_path() {
        let mut grid = CellGrid::new(3, 3, 1.0);
        // Make the middle column expensive; the cheap route goes around it.
        for y in 0..3 {
            grid.set_traversal_cost(CellCoord::new(1, y), 10);
        }
        grid.set_traversal_cost(CellCoord::new(1, 2), 1);
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let path = planner
            .find(CellCoord::new(0, 0), CellCoord::new(2, 0), &no_blocks())
            .unwrap();
        // 6 cheap steps beat 2 steps through a cost-10 cell.
        assert!(path.cells().contains(&CellCoord::new(1, 2)));
    }

    #[test]
    fn test_determinism() {
        let mut grid = empty_grid();
        grid.set_walkable(CellCoord::new(3, 3), false);
        grid.set_walkable(CellCoord::new(6, 2), false);
        let planner = GridAStar::new(&grid, PlannerConfig::default());
        let a = planner
            .find(CellCoord::new(0, 0), CellCoord::new(9, 9), &no_blocks())
            .unwrap();
        let b = planner
            .find(CellCoord::new(0, 0), CellCoord::new(9, 9), &no_blocks())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_find_path_convenience() {
        let grid = empty_grid();
        let path = find_path(
            &grid,
            CellCoord::new(2, 2),
            CellCoord::new(2, 7),
            &no_blocks(),
            &PlannerConfig::default(),
        )
        .unwrap();
        assert_eq!(path.len(), 6);
    }
}
