//! Spatio-temporal conflicts between planned paths.

use std::cmp::Ordering;

use agv_grid::CellCoord;

use crate::agent::AgentId;

/// Sentinel step used by warehouse-exclusion conflicts.
///
/// Sorting by step ascending therefore places warehouse conflicts after
/// every timed conflict.
pub const WAREHOUSE_STEP: u64 = u64::MAX;

/// The kind of a [`Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictKind {
    /// Two or more agents occupy the same cell at the same step.
    Vertex,
    /// Two agents exchange cells across one step; `other_cell` is the
    /// second cell of the exchanged pair.
    Swap {
        /// The cell on the other side of the exchanged edge.
        other_cell: CellCoord,
    },
    /// An agent's path crosses the 3×3 neighbourhood reserved by an agent
    /// docked at a warehouse anchor.
    WarehouseExclusion {
        /// The warehouse anchor cell at the centre of the reservation.
        anchor: CellCoord,
    },
}

impl ConflictKind {
    /// Rank used for deterministic ordering: Vertex < Swap < Warehouse.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Vertex => 0,
            Self::Swap { .. } => 1,
            Self::WarehouseExclusion { .. } => 2,
        }
    }
}

/// A detected conflict between the planned paths of two or more agents.
///
/// Conflicts are produced by detection, consumed by resolution, and never
/// persisted. The `involved` list is sorted, and the derived ordering of
/// conflicts is `(step, cell, kind rank)` — the order in which resolution
/// processes them.
///
/// # Example
///
/// ```
/// use agv_grid::CellCoord;
/// use agv_types::{AgentId, Conflict, ConflictKind};
///
/// let conflict = Conflict::new(
///     2,
///     CellCoord::new(2, 2),
///     ConflictKind::Vertex,
///     vec![AgentId::new("B"), AgentId::new("A")],
/// );
///
/// // Involved agents are kept sorted
/// assert_eq!(conflict.involved()[0].as_str(), "A");
/// assert!(conflict.involves(&AgentId::new("B")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conflict {
    step: u64,
    cell: CellCoord,
    kind: ConflictKind,
    involved: Vec<AgentId>,
}

impl Conflict {
    /// Creates a conflict; the involved list is sorted and deduplicated.
    #[must_use]
    pub fn new(step: u64, cell: CellCoord, kind: ConflictKind, mut involved: Vec<AgentId>) -> Self {
        involved.sort();
        involved.dedup();
        Self {
            step,
            cell,
            kind,
            involved,
        }
    }

    /// The 1-based step at which the conflict occurs
    /// ([`WAREHOUSE_STEP`] for warehouse exclusions).
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// The primary conflicting cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// The conflict kind.
    #[must_use]
    pub const fn kind(&self) -> ConflictKind {
        self.kind
    }

    /// The sorted ids of the agents involved.
    #[must_use]
    pub fn involved(&self) -> &[AgentId] {
        &self.involved
    }

    /// Returns `true` if the given agent is involved in this conflict.
    #[must_use]
    pub fn involves(&self, agent: &AgentId) -> bool {
        self.involved.binary_search(agent).is_ok()
    }

    /// Comparison key for the deterministic conflict ordering.
    #[must_use]
    pub fn sort_key(&self) -> (u64, i32, i32, u8) {
        (self.step, self.cell.x, self.cell.y, self.kind.rank())
    }
}

impl PartialOrd for Conflict {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Conflict {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.involved.cmp(&other.involved))
    }
}
