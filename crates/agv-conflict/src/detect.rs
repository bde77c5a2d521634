//! Conflict detection over a set of path assignments.
//!
//! Detection is a pure pass: it borrows the grid and the assignments and
//! produces a freshly ordered conflict list. Three kinds are reported:
//!
//! 1. **Vertex** — two or more agents occupy the same cell at the same step
//! 2. **Swap** — two agents exchange cells across one step
//! 3. **Warehouse exclusion** — a path crosses the 3×3 neighbourhood
//!    reserved by an agent docked at a warehouse anchor
//!
//! The output order is `(step, cell, kind)` ascending and is the order in
//! which resolution processes conflicts.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use agv_grid::{CellCoord, CellGrid};
use agv_types::{AgentId, Assignments, Conflict, ConflictKind, WAREHOUSE_STEP};

/// Inputs the warehouse-exclusion rule needs beyond the paths themselves.
///
/// The reservation condition depends on where each agent currently *is*,
/// not only on where it plans to go, so detection receives the current
/// cells alongside the anchor set. The condition is re-evaluated on every
/// pass; a reservation disappears as soon as its agent moves away.
#[derive(Debug, Clone, Default)]
pub struct WarehouseContext {
    /// Warehouse anchor cells of the site.
    pub anchors: std::collections::BTreeSet<CellCoord>,
    /// Each agent's current cell.
    pub agent_cells: BTreeMap<AgentId, CellCoord>,
}

impl WarehouseContext {
    /// A context with no anchors (disables the warehouse rule).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The walkable 3×3 neighbourhood around an anchor.
    pub(crate) fn reserved_cells<'a>(
        &self,
        grid: &'a CellGrid,
        anchor: CellCoord,
    ) -> impl Iterator<Item = CellCoord> + 'a {
        let cells: Vec<CellCoord> = (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| anchor.offset(dx, dy)))
            .filter(|&c| grid.is_walkable(c))
            .collect();
        cells.into_iter()
    }
}

/// Detects all conflicts in `assignments`, ordered by
/// `(step, cell, kind)` ascending.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use agv_grid::{CellCoord, CellGrid};
/// use agv_conflict::{WarehouseContext, detect_conflicts};
/// use agv_types::{AgentId, CellPath, ConflictKind};
///
/// let grid = CellGrid::new(10, 10, 1.0);
/// let mut assignments = BTreeMap::new();
/// // Both agents occupy (1, 0) at step 2
/// assignments.insert(
///     AgentId::new("A"),
///     CellPath::from_cells(vec![CellCoord::new(0, 0), CellCoord::new(1, 0)]).unwrap(),
/// );
/// assignments.insert(
///     AgentId::new("B"),
///     CellPath::from_cells(vec![CellCoord::new(2, 0), CellCoord::new(1, 0)]).unwrap(),
/// );
///
/// let conflicts = detect_conflicts(&grid, &assignments, &WarehouseContext::empty());
/// assert_eq!(conflicts.len(), 1);
/// assert_eq!(conflicts[0].kind(), ConflictKind::Vertex);
/// assert_eq!(conflicts[0].step(), 2);
/// ```
#[must_use]
pub fn detect_conflicts(
    grid: &CellGrid,
    assignments: &Assignments,
    ctx: &WarehouseContext,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    detect_vertex(assignments, &mut conflicts);
    detect_swaps(assignments, &mut conflicts);
    detect_warehouse(grid, assignments, ctx, &mut conflicts);
    conflicts.sort();
    conflicts
}

/// Vertex pass: index every `(cell, step)` occupation and report the
/// entries claimed by more than one agent.
fn detect_vertex(assignments: &Assignments, out: &mut Vec<Conflict>) {
    let mut occupancy: HashMap<(CellCoord, u64), Vec<AgentId>> = HashMap::new();
    for (agent, path) in assignments {
        for (step, cell) in path.steps() {
            occupancy.entry((cell, step)).or_default().push(agent.clone());
        }
    }
    for ((cell, step), agents) in occupancy {
        if agents.len() >= 2 {
            out.push(Conflict::new(step, cell, ConflictKind::Vertex, agents));
        }
    }
}

/// Swap pass: for each unordered agent pair, find steps where the two
/// exchange cells.
fn detect_swaps(assignments: &Assignments, out: &mut Vec<Conflict>) {
    let entries: Vec<(&AgentId, &agv_types::CellPath)> = assignments.iter().collect();
    for (i, &(agent_a, path_a)) in entries.iter().enumerate() {
        for &(agent_b, path_b) in &entries[i + 1..] {
            let horizon = path_a.len().min(path_b.len()) as u64;
            for step in 2..=horizon {
                let (Some(a_prev), Some(a_now)) = (path_a.step(step - 1), path_a.step(step))
                else {
                    continue;
                };
                let (Some(b_prev), Some(b_now)) = (path_b.step(step - 1), path_b.step(step))
                else {
                    continue;
                };
                if a_prev == b_now && b_prev == a_now && a_prev != a_now {
                    out.push(Conflict::new(
                        step,
                        a_now,
                        ConflictKind::Swap { other_cell: b_now },
                        vec![agent_a.clone(), agent_b.clone()],
                    ));
                }
            }
        }
    }
}

/// Warehouse pass: a docking agent reserves the walkable 3×3 around its
/// anchor at the sentinel step; any other agent crossing the reservation
/// conflicts with it.
///
/// An agent counts as docking when its plan ends on an anchor and it is
/// within Chebyshev 1 of that anchor, or when it has no plan and is
/// parked on the anchor itself.
fn detect_warehouse(
    grid: &CellGrid,
    assignments: &Assignments,
    ctx: &WarehouseContext,
    out: &mut Vec<Conflict>,
) {
    let mut docked: Vec<(AgentId, CellCoord)> = Vec::new();
    for (agent, path) in assignments {
        let anchor = path.last();
        if !ctx.anchors.contains(&anchor) {
            continue;
        }
        if let Some(&cell) = ctx.agent_cells.get(agent) {
            if cell.chebyshev_distance(anchor) <= 1 {
                docked.push((agent.clone(), anchor));
            }
        }
    }
    for (agent, &cell) in &ctx.agent_cells {
        if !assignments.contains_key(agent) && ctx.anchors.contains(&cell) {
            docked.push((agent.clone(), cell));
        }
    }

    for (docked_agent, anchor) in docked {
        let reserved: hashbrown::HashSet<CellCoord> =
            ctx.reserved_cells(grid, anchor).collect();
        for (other, other_path) in assignments {
            if *other == docked_agent {
                continue;
            }
            if other_path.cells().iter().any(|c| reserved.contains(c)) {
                out.push(Conflict::new(
                    WAREHOUSE_STEP,
                    anchor,
                    ConflictKind::WarehouseExclusion { anchor },
                    vec![docked_agent.clone(), other.clone()],
                ));
            }
        }
    }
}
