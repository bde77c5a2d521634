//! Read-only monitoring snapshots.

use std::collections::BTreeMap;

use nalgebra::Point2;

use agv_grid::CellCoord;
use agv_types::{AgentId, CellPath};

use crate::agent::AgentState;

/// Point-in-time view of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTelemetry {
    /// Coordination state.
    pub state: AgentState,
    /// World-space position.
    pub position: Point2<f64>,
    /// Grid cell of the position.
    pub cell: CellCoord,
    /// Committed path, if any.
    pub path: Option<CellPath>,
    /// Number of queued waypoints.
    pub queued_waypoints: usize,
}

/// Point-in-time view of the whole fleet.
///
/// Snapshots compare with `==`, which is how the determinism property is
/// checked: identical inputs must yield identical snapshots tick by tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// Lockstep tick counter.
    pub global_step: u64,
    /// Per-agent views, deterministically ordered.
    pub agents: BTreeMap<AgentId, AgentTelemetry>,
}

impl TelemetrySnapshot {
    /// Returns the agents currently holding a committed path.
    pub fn agents_with_paths(&self) -> impl Iterator<Item = (&AgentId, &CellPath)> {
        self.agents
            .iter()
            .filter_map(|(id, a)| a.path.as_ref().map(|p| (id, p)))
    }
}
