//! The central supervisor: authoritative plans and the lockstep tick loop.
//!
//! One `Supervisor` owns the grid, the agents, the committed paths, and
//! the lockstep phase. Everything runs on a single driver thread; external
//! inputs arrive through the [`crate::inbox`] and are applied between
//! ticks.
//!
//! Per tick, in order: vehicle motion and arrivals, dispatch to idle
//! agents, conflict resolution over the active paths, the lockstep
//! advance, path trimming, and waypoint completion.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use hashbrown::HashSet;
use nalgebra::Point2;
use tracing::{debug, info, warn};

use agv_conflict::{WarehouseContext, resolve_conflicts};
use agv_grid::{CellCoord, CellGrid, MapDefinition};
use agv_pathfind::find_path;
use agv_types::{
    AgentId, Assignments, CellPath, Conflict, PlannerConfig, PlanningError, ResolverConfig,
};

use crate::agent::{AgentState, AgvVehicle, MoveTicket, Vehicle};
use crate::error::SupervisorError;
use crate::inbox::{InboundMessage, ObstacleReport, RouteRequest};
use crate::obstacles::DynamicObstacles;
use crate::telemetry::{AgentTelemetry, TelemetrySnapshot};

/// Lockstep phase of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockstepPhase {
    /// Waiting for every path-holding agent to finish its current move.
    #[default]
    CollectingReady,
    /// All ready; the next advance releases one cell per agent.
    AllReadyAdvance,
}

/// Tunables for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    hold_time: Duration,
    trim_tolerance: f64,
    obstacle_debounce: Duration,
    vehicle_speed: f64,
    planner: PlannerConfig,
    resolver: ResolverConfig,
}

impl SupervisorConfig {
    /// Creates the default configuration: 1 s waypoint hold, trim
    /// tolerance 0.1 of a cell, 500 ms obstacle debounce.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hold_time: Duration::from_secs(1),
            trim_tolerance: 0.1,
            obstacle_debounce: DynamicObstacles::DEFAULT_DEBOUNCE,
            vehicle_speed: AgvVehicle::DEFAULT_SPEED,
            planner: PlannerConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }

    /// Sets how long an agent holds at a reached waypoint before going
    /// idle.
    #[must_use]
    pub const fn with_hold_time(mut self, hold: Duration) -> Self {
        self.hold_time = hold;
        self
    }

    /// Sets the trim tolerance as a fraction of the cell size.
    #[must_use]
    pub const fn with_trim_tolerance(mut self, tolerance: f64) -> Self {
        self.trim_tolerance = tolerance;
        self
    }

    /// Sets the obstacle report debounce window.
    #[must_use]
    pub const fn with_obstacle_debounce(mut self, debounce: Duration) -> Self {
        self.obstacle_debounce = debounce;
        self
    }

    /// Sets the speed of spawned vehicles (world units per second).
    #[must_use]
    pub const fn with_vehicle_speed(mut self, speed: f64) -> Self {
        self.vehicle_speed = speed;
        self
    }

    /// Sets the planner configuration.
    #[must_use]
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// Sets the resolver configuration.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// `true` if a lockstep advance happened this tick.
    pub advanced: bool,
    /// Lockstep counter after the tick.
    pub global_step: u64,
    /// Conflicts left unresolved by this tick's resolution pass.
    pub residual_conflicts: usize,
}

struct AgentSlot {
    vehicle: Box<dyn Vehicle>,
    state: AgentState,
    waypoints: VecDeque<Point2<f64>>,
    hold_until: Option<Duration>,
    ticket: Option<MoveTicket>,
}

/// The authoritative fleet coordinator.
pub struct Supervisor {
    grid: CellGrid,
    targets: BTreeMap<String, Point2<f64>>,
    warehouses: std::collections::BTreeSet<CellCoord>,
    agents: BTreeMap<AgentId, AgentSlot>,
    active: Assignments,
    obstacles: DynamicObstacles,
    phase: LockstepPhase,
    global_step: u64,
    stopped: bool,
    last_now: Duration,
    residual: Vec<Conflict>,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Creates a supervisor for the given site.
    #[must_use]
    pub fn new(map: &MapDefinition, config: SupervisorConfig) -> Self {
        Self {
            grid: map.build_grid(),
            targets: map.targets().clone(),
            warehouses: map.warehouse_anchors().clone(),
            agents: BTreeMap::new(),
            active: Assignments::new(),
            obstacles: DynamicObstacles::new(config.obstacle_debounce),
            phase: LockstepPhase::default(),
            global_step: 0,
            stopped: false,
            last_now: Duration::ZERO,
            residual: Vec::new(),
            config,
        }
    }

    /// Registers an agent with a simulated vehicle at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::DuplicateAgent`] if the id is taken.
    pub fn spawn_agent(
        &mut self,
        id: impl Into<AgentId>,
        position: Point2<f64>,
    ) -> Result<(), SupervisorError> {
        let vehicle = AgvVehicle::with_speed(position, self.config.vehicle_speed);
        self.spawn_vehicle(id, Box::new(vehicle))
    }

    /// Registers an agent with a caller-supplied vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::DuplicateAgent`] if the id is taken.
    pub fn spawn_vehicle(
        &mut self,
        id: impl Into<AgentId>,
        vehicle: Box<dyn Vehicle>,
    ) -> Result<(), SupervisorError> {
        let id = id.into();
        if self.agents.contains_key(&id) {
            return Err(SupervisorError::DuplicateAgent(id));
        }
        info!(agent = %id, "agent registered");
        self.agents.insert(
            id,
            AgentSlot {
                vehicle,
                state: AgentState::Idle,
                waypoints: VecDeque::new(),
                hold_until: None,
                ticket: None,
            },
        );
        Ok(())
    }

    /// Appends a waypoint to an agent's queue.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownAgent`] for unregistered ids.
    pub fn enqueue_waypoint(
        &mut self,
        id: &AgentId,
        target: Point2<f64>,
    ) -> Result<(), SupervisorError> {
        let slot = self
            .agents
            .get_mut(id)
            .ok_or_else(|| SupervisorError::UnknownAgent(id.clone()))?;
        slot.waypoints.push_back(target);
        Ok(())
    }

    /// Applies one inbound message.
    pub fn apply(&mut self, message: InboundMessage, now: Duration) {
        match message {
            InboundMessage::Routes(routes) => self.apply_routes(&routes),
            InboundMessage::Obstacles(report) => self.apply_obstacle_report(&report, now),
            InboundMessage::StopAll => self.stop_all(),
            InboundMessage::Resume => self.resume(),
        }
    }

    /// Appends route targets to waypoint queues and dispatches idle agents
    /// immediately. Unknown agents and unknown target names are logged
    /// and skipped entry by entry.
    pub fn apply_routes(&mut self, routes: &RouteRequest) {
        for (agent, names) in routes {
            let id = AgentId::new(agent.clone());
            if !self.agents.contains_key(&id) {
                warn!(agent = %id, "route for unknown agent skipped");
                continue;
            }
            for name in names {
                match self.targets.get(name) {
                    Some(&position) => {
                        if let Some(slot) = self.agents.get_mut(&id) {
                            slot.waypoints.push_back(position);
                        }
                    }
                    None => warn!(agent = %id, target = %name, "unknown route target skipped"),
                }
            }
        }
        // Newly routed idle agents should not wait for the next tick.
        self.dispatch_idle();
        self.resolve_active();
    }

    /// Applies a dynamic-obstacle report and invalidates any committed
    /// path that now crosses a blocked cell.
    pub fn apply_obstacle_report(&mut self, report: &ObstacleReport, now: Duration) {
        let id = AgentId::new(report.agent_id.clone());
        let Some(slot) = self.agents.get(&id) else {
            warn!(agent = %report.agent_id, "obstacle report from unknown agent dropped");
            return;
        };
        let reporter_cell = self.grid.cell_at(slot.vehicle.current_position());
        let heading = slot.vehicle.heading();
        let newly = self.obstacles.apply_report(
            &mut self.grid,
            &id,
            reporter_cell,
            heading,
            &report.blocked,
            now,
        );
        if newly.is_empty() {
            return;
        }

        let blocked: HashSet<CellCoord> = newly.into_iter().collect();
        let invalidated: Vec<AgentId> = self
            .active
            .iter()
            .filter(|(_, path)| path.cells().iter().skip(1).any(|c| blocked.contains(c)))
            .map(|(agent, _)| agent.clone())
            .collect();

        for agent in invalidated {
            let Some(path) = self.active.remove(&agent) else {
                continue;
            };
            let goal = self.grid.cell_to_world_center(path.last());
            if let Some(slot) = self.agents.get_mut(&agent) {
                // The original goal goes back to the front of the queue so
                // the next dispatch replans around the obstacle.
                slot.waypoints.push_front(goal);
                if slot.state == AgentState::WaitingForStep {
                    slot.state = AgentState::Idle;
                }
                warn!(agent = %agent, "committed path invalidated by dynamic obstacle");
            }
        }
    }

    /// Stops every agent; subsequent ticks no-op until [`Self::resume`].
    pub fn stop_all(&mut self) {
        info!("stop-all requested");
        self.stopped = true;
        self.phase = LockstepPhase::CollectingReady;
        for slot in self.agents.values_mut() {
            slot.state = AgentState::Blocked;
        }
    }

    /// Resumes after a stop.
    pub fn resume(&mut self) {
        info!("resuming after stop");
        self.stopped = false;
        for (id, slot) in &mut self.agents {
            if slot.state != AgentState::Blocked {
                continue;
            }
            slot.state = if slot.ticket.as_ref().is_some_and(|t| !t.is_complete()) {
                AgentState::Moving
            } else if self.active.contains_key(id) {
                AgentState::WaitingForStep
            } else {
                AgentState::Idle
            };
        }
    }

    /// Runs one tick of the coordination loop.
    pub fn tick(&mut self, now: Duration) -> TickReport {
        let dt = now.saturating_sub(self.last_now);
        self.last_now = now;

        if self.stopped {
            return TickReport {
                advanced: false,
                global_step: self.global_step,
                residual_conflicts: self.residual.len(),
            };
        }

        self.update_vehicles(dt, now);
        self.dispatch_idle();
        self.resolve_active();
        let advanced = self.advance_lockstep(now);
        self.trim_paths();
        self.complete_waypoints(now);

        TickReport {
            advanced,
            global_step: self.global_step,
            residual_conflicts: self.residual.len(),
        }
    }

    /// Drives vehicle motion and processes completed moves.
    fn update_vehicles(&mut self, dt: Duration, now: Duration) {
        for (id, slot) in &mut self.agents {
            slot.vehicle.update(dt);
            if slot.state != AgentState::Moving {
                continue;
            }
            if !slot.ticket.as_ref().is_some_and(MoveTicket::is_complete) {
                continue;
            }
            slot.ticket = None;

            // Consume the step that was just executed.
            if let Some(path) = self.active.get_mut(id) {
                if path.len() > 1 {
                    path.trim_before(1);
                }
                if path.len() == 1 {
                    self.active.remove(id);
                    slot.state = AgentState::WaitingAtTarget;
                    slot.hold_until = Some(now + self.config.hold_time);
                    debug!(agent = %id, "waypoint reached");
                } else {
                    slot.state = AgentState::WaitingForStep;
                }
            } else {
                // The path was withdrawn mid-move (obstacle invalidation);
                // fall back to dispatch.
                slot.state = AgentState::Idle;
            }
        }
    }

    /// Plans paths for idle agents with queued waypoints.
    fn dispatch_idle(&mut self) {
        // Cells of agents that will not move this pass (nothing committed
        // and nothing queued) are static for planning. Agents that hold
        // or are about to receive a plan free their cells as it unfolds;
        // conflict resolution arbitrates between them.
        let parked: HashSet<CellCoord> = self
            .agents
            .iter()
            .filter(|(id, slot)| {
                !self.active.contains_key(*id)
                    && !(slot.state == AgentState::Idle && !slot.waypoints.is_empty())
            })
            .map(|(_, slot)| self.grid.cell_at(slot.vehicle.current_position()))
            .collect();

        for (id, slot) in &mut self.agents {
            if slot.state != AgentState::Idle
                || slot.waypoints.is_empty()
                || self.active.contains_key(id)
            {
                continue;
            }
            let Some(&goal_world) = slot.waypoints.front() else {
                continue;
            };
            let start = self.grid.cell_at(slot.vehicle.current_position());
            let goal = self.grid.cell_at(goal_world);

            match find_path(&self.grid, start, goal, &parked, &self.config.planner) {
                Ok(path) => {
                    debug!(agent = %id, len = path.len(), "path assigned");
                    slot.vehicle.assign_path(&path);
                    self.active.insert(id.clone(), path);
                    slot.waypoints.pop_front();
                    slot.state = AgentState::WaitingForStep;
                }
                Err(err @ PlanningError::SearchExhausted { .. }) => {
                    warn!(agent = %id, %err, "planning failed; agent stays idle");
                }
                Err(err) => {
                    debug!(agent = %id, %err, "planning failed; agent stays idle");
                }
            }
        }
    }

    /// Runs conflict resolution over the committed paths.
    fn resolve_active(&mut self) {
        if self.active.is_empty() {
            self.residual.clear();
            return;
        }
        let ctx = self.warehouse_context();
        let resolution = resolve_conflicts(
            &self.grid,
            &self.active,
            &ctx,
            &self.config.resolver,
            &self.config.planner,
        );
        if resolution.exhausted {
            warn!(
                residual = resolution.unresolved.len(),
                "conflict resolution exhausted; residual conflicts tolerated"
            );
        }
        self.active = resolution.assignments;
        self.residual = resolution.unresolved;
    }

    /// Gate and advance: when no agent is mid-move and at least one agent
    /// can actually step, release one cell per ready agent.
    fn advance_lockstep(&mut self, now: Duration) -> bool {
        let any_moving = self
            .agents
            .values()
            .any(|slot| slot.state == AgentState::Moving);
        let ready: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(id, slot)| {
                slot.state == AgentState::WaitingForStep && self.active.contains_key(*id)
            })
            .map(|(id, _)| id.clone())
            .collect();

        if any_moving || ready.is_empty() {
            self.phase = LockstepPhase::CollectingReady;
            return false;
        }

        // Agents pinned by residual conflicts hold position.
        let movable: Vec<AgentId> = ready
            .into_iter()
            .filter(|id| !self.residual.iter().any(|c| c.involves(id)))
            .collect();
        if movable.is_empty() {
            self.phase = LockstepPhase::CollectingReady;
            return false;
        }

        self.phase = LockstepPhase::AllReadyAdvance;
        self.global_step += 1;
        debug!(step = self.global_step, agents = movable.len(), "lockstep advance");

        for id in movable {
            let Some(slot) = self.agents.get_mut(&id) else {
                continue;
            };
            let Some(path) = self.active.get(&id) else {
                continue;
            };
            if path.len() == 1 {
                // Already at the target cell.
                self.active.remove(&id);
                slot.state = AgentState::WaitingAtTarget;
                slot.hold_until = Some(now + self.config.hold_time);
                continue;
            }
            let next = path.cells()[1];
            let target = self.grid.cell_to_world_center(next);
            slot.ticket = Some(slot.vehicle.advance_one_cell(target));
            slot.state = AgentState::Moving;
        }

        true
    }

    /// Drops consumed path prefixes based on vehicle proximity. The first
    /// remaining cell is always kept.
    fn trim_paths(&mut self) {
        for (id, path) in &mut self.active {
            let Some(slot) = self.agents.get(id) else {
                continue;
            };
            let position = slot.vehicle.current_position();
            if let Some(index) = nearest_cell_index(
                &self.grid,
                path,
                position,
                self.config.trim_tolerance,
            ) {
                if index > 0 {
                    path.trim_before(index);
                }
            }
        }
    }

    /// Transitions held agents back to idle once their hold expires.
    fn complete_waypoints(&mut self, now: Duration) {
        for (id, slot) in &mut self.agents {
            if slot.state == AgentState::WaitingAtTarget
                && slot.hold_until.is_some_and(|until| now >= until)
            {
                slot.hold_until = None;
                slot.state = AgentState::Idle;
                debug!(agent = %id, "hold complete; agent idle");
            }
        }
    }

    fn warehouse_context(&self) -> WarehouseContext {
        WarehouseContext {
            anchors: self.warehouses.clone(),
            agent_cells: self
                .agents
                .iter()
                .map(|(id, slot)| (id.clone(), self.grid.cell_at(slot.vehicle.current_position())))
                .collect(),
        }
    }

    /// The committed plan.
    #[must_use]
    pub const fn active_paths(&self) -> &Assignments {
        &self.active
    }

    /// The lockstep counter.
    #[must_use]
    pub const fn global_step(&self) -> u64 {
        self.global_step
    }

    /// The current lockstep phase.
    #[must_use]
    pub const fn phase(&self) -> LockstepPhase {
        self.phase
    }

    /// The grid (including dynamic obstacle mutations).
    #[must_use]
    pub const fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// One agent's coordination state.
    #[must_use]
    pub fn agent_state(&self, id: &AgentId) -> Option<AgentState> {
        self.agents.get(id).map(|slot| slot.state)
    }

    /// A full monitoring snapshot.
    #[must_use]
    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            global_step: self.global_step,
            agents: self
                .agents
                .iter()
                .map(|(id, slot)| {
                    let position = slot.vehicle.current_position();
                    (
                        id.clone(),
                        AgentTelemetry {
                            state: slot.state,
                            position,
                            cell: self.grid.cell_at(position),
                            path: self.active.get(id).cloned(),
                            queued_waypoints: slot.waypoints.len(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Index of the path cell nearest to `position`, if within `tolerance`
/// (a fraction of the cell size). Earlier indices win ties so wait
/// duplicates are preserved.
fn nearest_cell_index(
    grid: &CellGrid,
    path: &CellPath,
    position: Point2<f64>,
    tolerance: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &cell) in path.cells().iter().enumerate() {
        let distance = (grid.cell_to_world_center(cell) - position).norm();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }
    best.and_then(|(index, distance)| {
        (distance <= tolerance * grid.cell_size()).then_some(index)
    })
}
