//! Error types for path planning.

use agv_grid::CellCoord;

/// Errors that can occur during single-agent path search.
///
/// Both failure modes are recoverable at the coordination layer: the agent
/// stays idle and the search is retried on a later tick once the world has
/// changed.
///
/// # Example
///
/// ```
/// use agv_grid::CellCoord;
/// use agv_types::PlanningError;
///
/// let error = PlanningError::NoPathFound {
///     start: CellCoord::new(0, 0),
///     goal: CellCoord::new(9, 9),
/// };
/// assert!(error.to_string().contains("no path found"));
/// assert!(error.is_no_path_found());
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PlanningError {
    /// No valid path exists between start and goal under the current
    /// walkability and transient blocks.
    #[error("no path found from ({}, {}) to ({}, {})", .start.x, .start.y, .goal.x, .goal.y)]
    NoPathFound {
        /// The starting cell.
        start: CellCoord,
        /// The goal cell.
        goal: CellCoord,
    },

    /// The search hit its expansion cap before reaching the goal.
    #[error("search exhausted after {expansions} expansions")]
    SearchExhausted {
        /// Number of expansions performed before giving up.
        expansions: usize,
    },

    /// The start cell is unwalkable or transiently blocked.
    #[error("start cell ({}, {}) is blocked", .0.x, .0.y)]
    StartBlocked(CellCoord),

    /// The goal cell is unwalkable or transiently blocked.
    #[error("goal cell ({}, {}) is blocked", .0.x, .0.y)]
    GoalBlocked(CellCoord),
}

impl PlanningError {
    /// Returns `true` if this is a "no path found" error.
    #[must_use]
    pub const fn is_no_path_found(&self) -> bool {
        matches!(self, Self::NoPathFound { .. })
    }

    /// Returns `true` if the search ran out of its expansion budget.
    #[must_use]
    pub const fn is_search_exhausted(&self) -> bool {
        matches!(self, Self::SearchExhausted { .. })
    }
}
