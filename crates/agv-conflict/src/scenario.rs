//! Candidate scenario enumeration for a single conflict.
//!
//! A scenario is a partial reassignment of paths restricted to the agents
//! involved in one conflict. Three families are enumerated, in a fixed
//! order:
//!
//! 1. **All-avoid** — every involved agent replans around the conflict
//!    cells
//! 2. **One-allowed** — one designated agent keeps the contested cells
//!    available, everyone else replans around them (one scenario per
//!    involved agent, in id order)
//! 3. **Wait-permutations** — for every non-empty proper subset `S` of the
//!    involved agents and every injective assignment of wait counts from
//!    `{1..k}` to `S` (`k` = the conflict step), the agents in `S` delay
//!    their current path by their assigned number of wait-in-place steps
//!
//! Enumeration is lazy in the sense that it stops as soon as the
//! configured scenario cap is reached; the cutoff is logged, never silent.

use hashbrown::HashSet;
use itertools::Itertools;
use tracing::warn;

use agv_grid::{CellCoord, CellGrid};
use agv_pathfind::GridAStar;
use agv_types::{AgentId, Assignments, CellPath, Conflict, ConflictKind, PlannerConfig, WAREHOUSE_STEP};

use crate::detect::WarehouseContext;

/// A candidate partial reassignment produced for one conflict.
///
/// Changes are kept sorted by agent id; the derived ordering doubles as
/// the deterministic tie-break between equally scored scenarios.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Scenario {
    changes: Vec<(AgentId, CellPath)>,
}

impl Scenario {
    fn new(mut changes: Vec<(AgentId, CellPath)>) -> Self {
        changes.sort();
        Self { changes }
    }

    /// The per-agent path changes of this scenario.
    #[must_use]
    pub fn changes(&self) -> &[(AgentId, CellPath)] {
        &self.changes
    }

    /// Applies the scenario on top of `assignments`, returning the result.
    #[must_use]
    pub fn applied_to(&self, assignments: &Assignments) -> Assignments {
        let mut out = assignments.clone();
        for (agent, path) in &self.changes {
            out.insert(agent.clone(), path.clone());
        }
        out
    }

    /// Sum of path lengths over the changed agents.
    #[must_use]
    pub fn total_length(&self) -> usize {
        self.changes.iter().map(|(_, p)| p.len()).sum()
    }

    /// Returns `true` if applying the scenario would change nothing.
    #[must_use]
    pub fn is_noop(&self, assignments: &Assignments) -> bool {
        self.changes
            .iter()
            .all(|(agent, path)| assignments.get(agent) == Some(path))
    }
}

/// The cells a scenario steers the involved agents away from.
///
/// Vertex conflicts block the contested cell; swaps block both exchanged
/// cells; warehouse exclusions block the whole reserved 3×3.
#[must_use]
pub fn avoidance_cells(grid: &CellGrid, conflict: &Conflict) -> Vec<CellCoord> {
    match conflict.kind() {
        ConflictKind::Vertex => vec![conflict.cell()],
        ConflictKind::Swap { other_cell } => vec![conflict.cell(), other_cell],
        ConflictKind::WarehouseExclusion { anchor } => WarehouseContext::default()
            .reserved_cells(grid, anchor)
            .collect(),
    }
}

/// Enumerates the candidate scenarios for `conflict` against the current
/// `assignments`, capped at `max_scenarios`.
///
/// Agents without a current path assignment are skipped; scenarios whose
/// replanning fails for any agent are not emitted.
#[must_use]
pub fn enumerate_scenarios(
    grid: &CellGrid,
    assignments: &Assignments,
    conflict: &Conflict,
    planner_config: &PlannerConfig,
    max_scenarios: usize,
) -> Vec<Scenario> {
    let involved: Vec<AgentId> = conflict
        .involved()
        .iter()
        .filter(|a| assignments.contains_key(*a))
        .cloned()
        .collect();
    if involved.is_empty() {
        return Vec::new();
    }

    let planner = GridAStar::new(grid, planner_config.clone());
    let avoid: HashSet<CellCoord> = avoidance_cells(grid, conflict).into_iter().collect();
    let no_blocks: HashSet<CellCoord> = HashSet::new();

    let replan = |agent: &AgentId, blocked: &HashSet<CellCoord>| -> Option<CellPath> {
        let current = assignments.get(agent)?;
        planner.find(current.first(), current.last(), blocked).ok()
    };

    let mut scenarios = Vec::new();

    // All-avoid: only valid when every involved agent finds a way around.
    let all_avoid: Option<Vec<(AgentId, CellPath)>> = involved
        .iter()
        .map(|agent| replan(agent, &avoid).map(|p| (agent.clone(), p)))
        .collect();
    if let Some(changes) = all_avoid {
        scenarios.push(Scenario::new(changes));
    }

    // One-allowed: the designated agent plans unrestricted, the others
    // around the contested cells.
    for allowed in &involved {
        if scenarios.len() >= max_scenarios {
            break;
        }
        let changes: Option<Vec<(AgentId, CellPath)>> = involved
            .iter()
            .map(|agent| {
                let blocked = if agent == allowed { &no_blocks } else { &avoid };
                replan(agent, blocked).map(|p| (agent.clone(), p))
            })
            .collect();
        if let Some(changes) = changes {
            scenarios.push(Scenario::new(changes));
        }
    }

    // Wait-permutations need a finite conflict step.
    if conflict.step() == WAREHOUSE_STEP {
        return scenarios;
    }
    let k = usize::try_from(conflict.step()).unwrap_or(0);
    if k == 0 {
        return scenarios;
    }

    let mut truncated = false;
    'outer: for subset_size in 1..involved.len() {
        for subset in involved.iter().combinations(subset_size) {
            for waits in (1..=k).permutations(subset_size) {
                if scenarios.len() >= max_scenarios {
                    truncated = true;
                    break 'outer;
                }
                let changes: Vec<(AgentId, CellPath)> = subset
                    .iter()
                    .zip(&waits)
                    .filter_map(|(agent, &wait)| {
                        assignments
                            .get(*agent)
                            .map(|p| ((*agent).clone(), p.with_prefix_waits(wait)))
                    })
                    .collect();
                if changes.len() == subset.len() {
                    scenarios.push(Scenario::new(changes));
                }
            }
        }
    }
    if truncated {
        warn!(
            step = conflict.step(),
            cell = ?conflict.cell(),
            limit = max_scenarios,
            "scenario enumeration cut off at the configured cap"
        );
    }

    scenarios
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn grid() -> CellGrid {
        CellGrid::new(10, 10, 1.0)
    }

    fn path(cells: &[(i32, i32)]) -> CellPath {
        CellPath::from_cells(cells.iter().map(|&(x, y)| CellCoord::new(x, y)).collect()).unwrap()
    }

    fn vertex_conflict(step: u64, cell: (i32, i32), agents: &[&str]) -> Conflict {
        Conflict::new(
            step,
            CellCoord::new(cell.0, cell.1),
            ConflictKind::Vertex,
            agents.iter().map(|s| AgentId::new(*s)).collect(),
        )
    }

    fn two_agent_assignments() -> Assignments {
        let mut assignments = BTreeMap::new();
        assignments.insert(AgentId::new("A"), path(&[(0, 2), (1, 2), (2, 2), (3, 2), (4, 2)]));
        assignments.insert(AgentId::new("B"), path(&[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]));
        assignments
    }

    #[test]
    fn test_scenario_count_for_two_agents() {
        // 1 all-avoid + 2 one-allowed + wait-perms over proper subsets of
        // size 1 with k = 3: 2 agents × 3 wait counts = 6. Total 9.
        let assignments = two_agent_assignments();
        let conflict = vertex_conflict(3, (2, 2), &["A", "B"]);
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        assert_eq!(scenarios.len(), 9);
    }

    #[test]
    fn test_scenario_count_for_three_agents() {
        // 1 + 3 + (3 subsets of size 1 × P(3,1)=3) + (3 subsets of size 2
        // × P(3,2)=6) = 1 + 3 + 9 + 18 = 31.
        let mut assignments = two_agent_assignments();
        assignments.insert(
            AgentId::new("C"),
            path(&[(4, 4), (3, 4), (2, 4), (2, 3), (2, 2)]),
        );
        // Make all three meet (2,2) at step 3 for the purposes of the count;
        // the enumeration only looks at involvement, not at re-detection.
        let conflict = vertex_conflict(3, (2, 2), &["A", "B", "C"]);
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        assert_eq!(scenarios.len(), 31);
    }

    #[test]
    fn test_wait_scenarios_prefix_the_start_cell() {
        let assignments = two_agent_assignments();
        let conflict = vertex_conflict(3, (2, 2), &["A", "B"]);
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);

        let waited = scenarios
            .iter()
            .filter(|s| s.changes().len() == 1)
            .find(|s| s.changes()[0].0 == AgentId::new("B") && s.changes()[0].1.len() == 6)
            .expect("single-agent wait scenario for B");
        let delayed = &waited.changes()[0].1;
        assert_eq!(delayed.step(1), Some(CellCoord::new(2, 0)));
        assert_eq!(delayed.step(2), Some(CellCoord::new(2, 0)));
        assert!(delayed.is_contiguous());
    }

    #[test]
    fn test_cap_truncates() {
        let assignments = two_agent_assignments();
        let conflict = vertex_conflict(3, (2, 2), &["A", "B"]);
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4);
        assert_eq!(scenarios.len(), 4);
    }

    #[test]
    fn test_unknown_agents_are_skipped() {
        let assignments = two_agent_assignments();
        let conflict = vertex_conflict(3, (2, 2), &["A", "Z"]);
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        // Only A is resolvable; wait-perms need a proper subset so none
        // exist, leaving all-avoid + one-allowed.
        assert!(!scenarios.is_empty());
        assert!(scenarios.iter().all(|s| s
            .changes()
            .iter()
            .all(|(agent, _)| agent == &AgentId::new("A"))));
    }

    #[test]
    fn test_only_waits_remain_when_replanning_impossible() {
        // Corridor world: only row y=0 is walkable, so there is no way
        // around the contested cell and waits need k >= 1 proper subsets.
        let mut grid = CellGrid::new(4, 2, 1.0);
        for x in 0..4 {
            grid.set_walkable(CellCoord::new(x, 1), false);
        }
        let mut assignments = BTreeMap::new();
        assignments.insert(AgentId::new("A"), path(&[(1, 0), (2, 0)]));
        assignments.insert(AgentId::new("B"), path(&[(2, 0), (1, 0)]));
        let conflict = Conflict::new(
            2,
            CellCoord::new(2, 0),
            ConflictKind::Swap {
                other_cell: CellCoord::new(1, 0),
            },
            vec![AgentId::new("A"), AgentId::new("B")],
        );
        let scenarios =
            enumerate_scenarios(&grid, &assignments, &conflict, &PlannerConfig::default(), 4096);
        // All-avoid and one-allowed all fail (endpoints are inside the
        // avoidance set); only wait scenarios remain.
        assert!(scenarios.iter().all(|s| s.changes().len() == 1));
    }

    #[test]
    fn test_warehouse_conflicts_have_no_wait_scenarios() {
        let mut assignments = two_agent_assignments();
        assignments.insert(AgentId::new("W"), path(&[(5, 5)]));
        let conflict = Conflict::new(
            WAREHOUSE_STEP,
            CellCoord::new(5, 5),
            ConflictKind::WarehouseExclusion {
                anchor: CellCoord::new(5, 5),
            },
            vec![AgentId::new("W"), AgentId::new("B")],
        );
        let scenarios =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        // 1 all-avoid + 2 one-allowed at most, never wait permutations.
        assert!(scenarios.len() <= 3);
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let assignments = two_agent_assignments();
        let conflict = vertex_conflict(3, (2, 2), &["A", "B"]);
        let first =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        let second =
            enumerate_scenarios(&grid(), &assignments, &conflict, &PlannerConfig::default(), 4096);
        assert_eq!(first, second);
    }
}
