//! Heuristic and cost functions for grid path search.

use agv_grid::CellCoord;

/// Cost added per axis-aligned move onto a default-cost cell.
pub const STEP_COST: u64 = 10;

/// Estimates the remaining cost from `from` to `to`.
///
/// The estimate is `10·min(dx, dy) + 10·|dx − dy|` — the classic
/// straight/diagonal split with the diagonal weight collapsed to the
/// straight weight. On a 4-connected grid every step costs at least
/// [`STEP_COST`], so the estimate never overestimates and the search stays
/// optimal.
///
/// # Example
///
/// ```
/// use agv_grid::CellCoord;
/// use agv_pathfind::heuristics::step_heuristic;
///
/// let a = CellCoord::new(0, 0);
/// assert_eq!(step_heuristic(a, CellCoord::new(5, 0)), 50);
/// assert_eq!(step_heuristic(a, CellCoord::new(3, 4)), 40);
/// assert_eq!(step_heuristic(a, a), 0);
/// ```
#[must_use]
pub fn step_heuristic(from: CellCoord, to: CellCoord) -> u64 {
    let dx = u64::from(from.x.abs_diff(to.x));
    let dy = u64::from(from.y.abs_diff(to.y));
    let diagonal = dx.min(dy);
    let straight = dx.abs_diff(dy);
    STEP_COST * diagonal + STEP_COST * straight
}

/// Cost of stepping onto `to`: [`STEP_COST`] scaled by the destination
/// cell's traversal cost.
#[must_use]
pub fn move_cost(traversal_cost: u32) -> u64 {
    STEP_COST * u64::from(traversal_cost.max(1))
}
