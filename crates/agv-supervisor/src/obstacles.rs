//! Dynamic obstacle ingestion.
//!
//! Vehicles report blocked cells as `(right, forward)` offsets in their
//! own local frame. Reports are debounced per reporter, rotated into grid
//! space by the reporter's heading, and accepted cells become unwalkable
//! and stay that way — clearance is an explicit external action, not
//! something this layer guesses at.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use agv_grid::{CellCoord, CellGrid};
use agv_types::AgentId;

use crate::agent::Heading;

/// Debounced, sticky set of dynamically reported obstacles.
#[derive(Debug, Clone)]
pub struct DynamicObstacles {
    /// Minimum time between accepted reports from the same reporter.
    debounce: Duration,
    /// Last accepted report time per reporter.
    last_accepted: BTreeMap<AgentId, Duration>,
    /// Marked cells and when they were reported.
    cells: BTreeMap<CellCoord, Duration>,
}

impl DynamicObstacles {
    /// Default debounce window between accepted reports per reporter.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

    /// Creates an empty obstacle set with the given debounce window.
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_accepted: BTreeMap::new(),
            cells: BTreeMap::new(),
        }
    }

    /// Returns `true` if `cell` has been marked as a dynamic obstacle.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Number of marked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cells have been marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Applies a report, mutating grid walkability for accepted cells.
    ///
    /// For each offset: the target cell is skipped when it is the
    /// reporter's own cell, already marked, or not walkable (including out
    /// of bounds). The whole report is dropped when the reporter's last
    /// accepted report was less than the debounce window ago.
    ///
    /// Returns the cells that were newly marked.
    pub fn apply_report(
        &mut self,
        grid: &mut CellGrid,
        reporter: &AgentId,
        reporter_cell: CellCoord,
        heading: Heading,
        offsets: &[(i32, i32)],
        now: Duration,
    ) -> Vec<CellCoord> {
        if let Some(&last) = self.last_accepted.get(reporter) {
            if now.saturating_sub(last) < self.debounce {
                debug!(%reporter, "obstacle report debounced");
                return Vec::new();
            }
        }

        let mut accepted = Vec::new();
        for &(right, forward) in offsets {
            let (dx, dy) = heading.to_grid_offset(right, forward);
            let target = reporter_cell.offset(dx, dy);
            if target == reporter_cell || self.contains(target) || !grid.is_walkable(target) {
                continue;
            }
            grid.set_walkable(target, false);
            self.cells.insert(target, now);
            accepted.push(target);
        }

        if accepted.is_empty() {
            debug!(%reporter, "obstacle report contained nothing new");
        } else {
            self.last_accepted.insert(reporter.clone(), now);
            info!(%reporter, cells = ?accepted, "dynamic obstacles marked");
        }
        accepted
    }
}

impl Default for DynamicObstacles {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn setup() -> (CellGrid, DynamicObstacles, AgentId) {
        (
            CellGrid::new(10, 10, 1.0),
            DynamicObstacles::default(),
            AgentId::new("AUGV_1"),
        )
    }

    #[test]
    fn test_report_marks_cells() {
        let (mut grid, mut obstacles, reporter) = setup();
        let accepted = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1), (1, 2)],
            Duration::from_secs(1),
        );
        assert_eq!(
            accepted,
            vec![CellCoord::new(5, 6), CellCoord::new(6, 7)]
        );
        assert!(!grid.is_walkable(CellCoord::new(5, 6)));
        assert!(obstacles.contains(CellCoord::new(6, 7)));
    }

    #[test]
    fn test_offsets_rotate_with_heading() {
        let (mut grid, mut obstacles, reporter) = setup();
        // Reporter faces east; one cell ahead is +x.
        let accepted = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::East,
            &[(0, 1)],
            Duration::from_secs(1),
        );
        assert_eq!(accepted, vec![CellCoord::new(6, 5)]);
    }

    #[test]
    fn test_reporter_cell_is_skipped() {
        let (mut grid, mut obstacles, reporter) = setup();
        let accepted = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 0)],
            Duration::from_secs(1),
        );
        assert!(accepted.is_empty());
        assert!(grid.is_walkable(CellCoord::new(5, 5)));
    }

    #[test]
    fn test_unwalkable_and_out_of_bounds_skipped() {
        let (mut grid, mut obstacles, reporter) = setup();
        grid.set_walkable(CellCoord::new(5, 6), false);
        let accepted = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1), (0, 10)],
            Duration::from_secs(1),
        );
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_debounce_window() {
        let (mut grid, mut obstacles, reporter) = setup();
        let first = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1)],
            Duration::from_millis(1000),
        );
        assert_eq!(first.len(), 1);

        // 300 ms later: inside the window, dropped.
        let second = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 2)],
            Duration::from_millis(1300),
        );
        assert!(second.is_empty());
        assert!(grid.is_walkable(CellCoord::new(5, 7)));

        // 600 ms later: accepted again.
        let third = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 2)],
            Duration::from_millis(1600),
        );
        assert_eq!(third, vec![CellCoord::new(5, 7)]);
    }

    #[test]
    fn test_debounce_is_per_reporter() {
        let (mut grid, mut obstacles, reporter) = setup();
        let other = AgentId::new("AUGV_2");
        obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1)],
            Duration::from_millis(1000),
        );
        // A different reporter is not debounced by the first one's clock.
        let accepted = obstacles.apply_report(
            &mut grid,
            &other,
            CellCoord::new(2, 2),
            Heading::North,
            &[(0, 1)],
            Duration::from_millis(1100),
        );
        assert_eq!(accepted, vec![CellCoord::new(2, 3)]);
    }

    #[test]
    fn test_obstacles_are_sticky() {
        let (mut grid, mut obstacles, reporter) = setup();
        obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1)],
            Duration::from_secs(1),
        );
        // Re-reporting the same cell much later changes nothing and the
        // cell stays blocked.
        let again = obstacles.apply_report(
            &mut grid,
            &reporter,
            CellCoord::new(5, 5),
            Heading::North,
            &[(0, 1)],
            Duration::from_secs(10),
        );
        assert!(again.is_empty());
        assert!(!grid.is_walkable(CellCoord::new(5, 6)));
        assert_eq!(obstacles.len(), 1);
    }
}
