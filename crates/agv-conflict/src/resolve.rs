//! Conflict resolution by scored scenario selection with recursive repair.
//!
//! Each pass walks the detected conflicts in step order, picks the best
//! candidate scenario for each (conflict-free beats conflicted, then
//! smallest aggregate path length over the involved agents, then a
//! deterministic tie-break), and applies it to a pending copy that later
//! conflicts in the same pass can see. Committed passes repeat until the
//! plan is clean, no pass makes progress, or the depth cap is reached.
//!
//! When conflicts survive every pass, the rewritten plans are kept only if
//! they carry strictly fewer of the original conflicts; otherwise the
//! input assignments come back untouched alongside the exhausted flag.

use tracing::{debug, warn};

use agv_grid::CellGrid;
use agv_types::{Assignments, CellPath, Conflict, PlannerConfig, ResolverConfig};

use crate::detect::{WarehouseContext, detect_conflicts};
use crate::scenario::{Scenario, enumerate_scenarios};

/// Outcome of a resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The (possibly rewritten) assignments.
    pub assignments: Assignments,
    /// `true` if conflicts remained when resolution stopped.
    pub exhausted: bool,
    /// Conflicts still present in the returned assignments.
    pub unresolved: Vec<Conflict>,
}

impl Resolution {
    /// Returns `true` if the returned assignments are conflict-free.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Score of a candidate scenario against the pending assignments:
/// conflict-free always beats conflicted, then the smallest aggregate
/// path length over the conflict's involved agents wins.
fn score(
    grid: &CellGrid,
    pending: &Assignments,
    ctx: &WarehouseContext,
    conflict: &Conflict,
    scenario: &Scenario,
) -> (bool, usize) {
    let candidate = scenario.applied_to(pending);
    let has_conflict = !detect_conflicts(grid, &candidate, ctx).is_empty();
    let total = conflict
        .involved()
        .iter()
        .filter_map(|agent| candidate.get(agent))
        .map(CellPath::len)
        .sum();
    (has_conflict, total)
}

/// `true` if `remaining` is a strict subset of `initial`.
fn is_strict_subset(remaining: &[Conflict], initial: &[Conflict]) -> bool {
    remaining.len() < initial.len() && remaining.iter().all(|c| initial.contains(c))
}

/// Rewrites `assignments` until conflict-free, or returns the best effort
/// with `exhausted` set.
///
/// Running on already conflict-free assignments returns them unchanged.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use agv_grid::{CellCoord, CellGrid};
/// use agv_conflict::{WarehouseContext, resolve_conflicts};
/// use agv_types::{AgentId, CellPath, PlannerConfig, ResolverConfig};
///
/// let grid = CellGrid::new(10, 10, 1.0);
/// let mut assignments = BTreeMap::new();
/// assignments.insert(
///     AgentId::new("A"),
///     CellPath::from_cells(vec![
///         CellCoord::new(0, 2),
///         CellCoord::new(1, 2),
///         CellCoord::new(2, 2),
///         CellCoord::new(3, 2),
///     ])
///     .unwrap(),
/// );
/// assignments.insert(
///     AgentId::new("B"),
///     CellPath::from_cells(vec![
///         CellCoord::new(2, 0),
///         CellCoord::new(2, 1),
///         CellCoord::new(2, 2),
///         CellCoord::new(2, 3),
///     ])
///     .unwrap(),
/// );
///
/// let resolution = resolve_conflicts(
///     &grid,
///     &assignments,
///     &WarehouseContext::empty(),
///     &ResolverConfig::default(),
///     &PlannerConfig::default(),
/// );
/// assert!(resolution.is_clean());
/// ```
#[must_use]
pub fn resolve_conflicts(
    grid: &CellGrid,
    assignments: &Assignments,
    ctx: &WarehouseContext,
    resolver_config: &ResolverConfig,
    planner_config: &PlannerConfig,
) -> Resolution {
    let initial = detect_conflicts(grid, assignments, ctx);
    if initial.is_empty() {
        return Resolution {
            assignments: assignments.clone(),
            exhausted: false,
            unresolved: Vec::new(),
        };
    }

    let mut current = assignments.clone();

    for depth in 0..resolver_config.max_depth() {
        let conflicts = detect_conflicts(grid, &current, ctx);
        if conflicts.is_empty() {
            return Resolution {
                assignments: current,
                exhausted: false,
                unresolved: Vec::new(),
            };
        }
        debug!(depth, conflicts = conflicts.len(), "resolution pass");

        let mut pending = current.clone();
        let mut progressed = false;

        for conflict in &conflicts {
            let scenarios = enumerate_scenarios(
                grid,
                &pending,
                conflict,
                planner_config,
                resolver_config.max_scenarios(),
            );
            if scenarios.is_empty() {
                warn!(
                    step = conflict.step(),
                    cell = ?conflict.cell(),
                    "no valid scenario for conflict; leaving it unresolved this pass"
                );
                continue;
            }

            // Smallest score wins; ties keep the lexicographically greatest
            // scenario, which leaves earlier agents' current paths
            // undisturbed and delays or reroutes the later ones.
            let mut best: Option<((bool, usize), &Scenario)> = None;
            for candidate in &scenarios {
                let candidate_score = score(grid, &pending, ctx, conflict, candidate);
                let better = match &best {
                    None => true,
                    Some((best_score, best_scenario)) => {
                        candidate_score < *best_score
                            || (candidate_score == *best_score && candidate > *best_scenario)
                    }
                };
                if better {
                    best = Some((candidate_score, candidate));
                }
            }
            let Some((_, chosen)) = best else { continue };

            if !chosen.is_noop(&pending) {
                progressed = true;
            }
            pending = chosen.applied_to(&pending);
        }

        if !progressed {
            break;
        }
        current = pending;
    }

    let remaining = detect_conflicts(grid, &current, ctx);
    if remaining.is_empty() {
        return Resolution {
            assignments: current,
            exhausted: false,
            unresolved: Vec::new(),
        };
    }

    // Keep partial progress only when it strictly shrank the original
    // conflict set; otherwise hand back the input untouched.
    if is_strict_subset(&remaining, &initial) {
        warn!(
            remaining = remaining.len(),
            initial = initial.len(),
            "resolution exhausted with partial progress"
        );
        Resolution {
            assignments: current,
            exhausted: true,
            unresolved: remaining,
        }
    } else {
        warn!(
            conflicts = initial.len(),
            "resolution exhausted without progress; returning input unchanged"
        );
        Resolution {
            assignments: assignments.clone(),
            exhausted: true,
            unresolved: initial,
        }
    }
}
