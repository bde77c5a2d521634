//! End-to-end coordination scenarios on a 10×10 grid.
//!
//! Each test drives a full supervisor through its tick loop and checks
//! the fleet-level guarantees: no two agents on one cell, no edge swaps,
//! contiguous paths, monotonic lockstep, deterministic re-runs.

use std::time::Duration;

use nalgebra::Point2;

use agv_grid::{CellCoord, MapDefinition};
use agv_supervisor::{
    AgentState, InboundMessage, ObstacleReport, Supervisor, SupervisorConfig, TelemetrySnapshot,
};
use agv_types::AgentId;

fn cell_center(x: i32, y: i32) -> Point2<f64> {
    Point2::new(f64::from(x) + 0.5, f64::from(y) + 0.5)
}

fn config() -> SupervisorConfig {
    SupervisorConfig::new()
        .with_vehicle_speed(100.0)
        .with_hold_time(Duration::from_millis(500))
}

fn open_map() -> MapDefinition {
    MapDefinition::builder(10, 10).build().unwrap()
}

/// No two agents on the same cell, and every committed path contiguous.
fn assert_fleet_invariants(telemetry: &TelemetrySnapshot, tick: u64) {
    let mut seen = std::collections::HashSet::new();
    for (id, agent) in &telemetry.agents {
        assert!(
            seen.insert(agent.cell),
            "agents share cell {:?} at tick {tick} ({id})",
            agent.cell
        );
        if let Some(path) = &agent.path {
            assert!(path.is_contiguous(), "discontiguous path for {id} at tick {tick}");
        }
    }
}

fn run(supervisor: &mut Supervisor, seconds: std::ops::RangeInclusive<u64>) {
    for i in seconds {
        supervisor.tick(Duration::from_secs(i));
        assert_fleet_invariants(&supervisor.telemetry(), i);
    }
}

#[test]
fn head_on_corridor_reroutes_second_agent() {
    // Rows 0 and 1 form the world; everything above is walled off. A and
    // B approach head-on along row 0, so one of them has to take row 1.
    let map = MapDefinition::builder(10, 10)
        .block_all(
            (0..10).flat_map(|x| (2..10).map(move |y| CellCoord::new(x, y))),
        )
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(&map, config());
    let a = AgentId::new("A");
    let b = AgentId::new("B");
    supervisor.spawn_agent("A", cell_center(0, 0)).unwrap();
    supervisor.spawn_agent("B", cell_center(3, 0)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(3, 0)).unwrap();
    supervisor.enqueue_waypoint(&b, cell_center(0, 0)).unwrap();

    run(&mut supervisor, 1..=20);

    let telemetry = supervisor.telemetry();
    assert_eq!(telemetry.agents[&a].cell, CellCoord::new(3, 0));
    assert_eq!(telemetry.agents[&b].cell, CellCoord::new(0, 0));
    assert_eq!(telemetry.agents[&a].state, AgentState::Idle);
    assert_eq!(telemetry.agents[&b].state, AgentState::Idle);
}

#[test]
fn vertex_conflict_at_junction_lets_one_pass_first() {
    let mut supervisor = Supervisor::new(&open_map(), config());
    let a = AgentId::new("A");
    let b = AgentId::new("B");
    supervisor.spawn_agent("A", cell_center(0, 2)).unwrap();
    supervisor.spawn_agent("B", cell_center(2, 0)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(4, 2)).unwrap();
    supervisor.enqueue_waypoint(&b, cell_center(2, 4)).unwrap();

    // After the first tick both hold resolved plans; the junction (2, 2)
    // must be claimed at distinct steps.
    supervisor.tick(Duration::from_secs(1));
    let junction = CellCoord::new(2, 2);
    let mut claims = std::collections::HashSet::new();
    for (_, path) in supervisor.telemetry().agents_with_paths() {
        for (step, cell) in path.steps() {
            if cell == junction {
                assert!(claims.insert(step), "junction claimed twice at step {step}");
            }
        }
    }

    run(&mut supervisor, 2..=15);
    let telemetry = supervisor.telemetry();
    assert_eq!(telemetry.agents[&a].cell, CellCoord::new(4, 2));
    assert_eq!(telemetry.agents[&b].cell, CellCoord::new(2, 4));
}

#[test]
fn facing_agents_in_sealed_corridor_stay_put() {
    // Only (1, 0) and (2, 0) exist; the agents want to swap. There is no
    // plan that does it, so nobody may move and nothing may crash.
    let map = MapDefinition::builder(4, 1)
        .block(CellCoord::new(0, 0))
        .block(CellCoord::new(3, 0))
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(&map, config());
    let a = AgentId::new("A");
    let b = AgentId::new("B");
    supervisor.spawn_agent("A", cell_center(1, 0)).unwrap();
    supervisor.spawn_agent("B", cell_center(2, 0)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(2, 0)).unwrap();
    supervisor.enqueue_waypoint(&b, cell_center(1, 0)).unwrap();

    run(&mut supervisor, 1..=8);

    let telemetry = supervisor.telemetry();
    assert_eq!(telemetry.agents[&a].cell, CellCoord::new(1, 0));
    assert_eq!(telemetry.agents[&b].cell, CellCoord::new(2, 0));
    assert_eq!(supervisor.global_step(), 0);
}

#[test]
fn docked_agent_excludes_its_warehouse_neighbourhood() {
    let map = MapDefinition::builder(10, 10)
        .warehouse(CellCoord::new(5, 5))
        .build()
        .unwrap();
    let mut supervisor = Supervisor::new(&map, config());
    let b = AgentId::new("B");
    // A is parked at the anchor with nothing to do; B wants to cross the
    // row straight through it.
    supervisor.spawn_agent("A", cell_center(5, 5)).unwrap();
    supervisor.spawn_agent("B", cell_center(0, 5)).unwrap();
    supervisor.enqueue_waypoint(&b, cell_center(9, 5)).unwrap();

    supervisor.tick(Duration::from_secs(1));

    // B's committed plan keeps out of the whole 3×3 reservation.
    let anchor = CellCoord::new(5, 5);
    let path = supervisor.active_paths()[&b].clone();
    for cell in path.cells() {
        assert!(
            cell.chebyshev_distance(anchor) > 1,
            "plan crosses the reserved box at {cell:?}"
        );
    }
    // Direct would be 10 cells; around the box costs at least 2 more.
    assert!(path.len() >= 12, "detour too short: {} cells", path.len());

    run(&mut supervisor, 2..=25);
    assert_eq!(supervisor.telemetry().agents[&b].cell, CellCoord::new(9, 5));
}

#[test]
fn dynamic_obstacle_forces_replan_mid_route() {
    let mut supervisor = Supervisor::new(&open_map(), config());
    let a = AgentId::new("A");
    supervisor.spawn_agent("A", cell_center(0, 0)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(5, 0)).unwrap();

    // Two advances in: the agent is under way along row 0.
    supervisor.tick(Duration::from_secs(1));
    supervisor.tick(Duration::from_secs(2));

    // The vehicle reports a person three cells ahead, which lands on
    // (4, 0) given its eastward heading.
    let reporter_cell = supervisor.telemetry().agents[&a].cell;
    let forward = 4 - reporter_cell.x;
    supervisor.apply(
        InboundMessage::Obstacles(ObstacleReport {
            agent_id: "A".into(),
            blocked: vec![(0, forward)],
        }),
        Duration::from_secs(2),
    );
    assert!(!supervisor.grid().is_walkable(CellCoord::new(4, 0)));

    run(&mut supervisor, 3..=20);

    let telemetry = supervisor.telemetry();
    assert_eq!(telemetry.agents[&a].cell, CellCoord::new(5, 0));
    // The obstacle is sticky.
    assert!(!supervisor.grid().is_walkable(CellCoord::new(4, 0)));
}

#[test]
fn three_way_contention_at_one_cell() {
    let mut supervisor = Supervisor::new(&open_map(), config());
    let a = AgentId::new("A");
    let b = AgentId::new("B");
    let c = AgentId::new("C");
    supervisor.spawn_agent("A", cell_center(1, 3)).unwrap();
    supervisor.spawn_agent("B", cell_center(3, 1)).unwrap();
    supervisor.spawn_agent("C", cell_center(3, 6)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(5, 3)).unwrap();
    supervisor.enqueue_waypoint(&b, cell_center(3, 5)).unwrap();
    supervisor.enqueue_waypoint(&c, cell_center(3, 0)).unwrap();

    // After planning and resolution, (3, 3) is claimed at unique steps.
    supervisor.tick(Duration::from_secs(1));
    let contested = CellCoord::new(3, 3);
    let mut claims = std::collections::HashSet::new();
    for (_, path) in supervisor.telemetry().agents_with_paths() {
        for (step, cell) in path.steps() {
            if cell == contested {
                assert!(claims.insert(step), "cell claimed twice at step {step}");
            }
        }
    }

    run(&mut supervisor, 2..=30);

    let telemetry = supervisor.telemetry();
    assert_eq!(telemetry.agents[&a].cell, CellCoord::new(5, 3));
    assert_eq!(telemetry.agents[&b].cell, CellCoord::new(3, 5));
    assert_eq!(telemetry.agents[&c].cell, CellCoord::new(3, 0));
}

#[test]
fn identical_runs_produce_identical_telemetry() {
    let build = || {
        let mut supervisor = Supervisor::new(&open_map(), config());
        supervisor.spawn_agent("A", cell_center(1, 3)).unwrap();
        supervisor.spawn_agent("B", cell_center(3, 1)).unwrap();
        supervisor.spawn_agent("C", cell_center(3, 6)).unwrap();
        supervisor
            .enqueue_waypoint(&AgentId::new("A"), cell_center(5, 3))
            .unwrap();
        supervisor
            .enqueue_waypoint(&AgentId::new("B"), cell_center(3, 5))
            .unwrap();
        supervisor
            .enqueue_waypoint(&AgentId::new("C"), cell_center(3, 0))
            .unwrap();
        supervisor
    };

    let mut first = build();
    let mut second = build();
    for i in 1..=25 {
        let now = Duration::from_secs(i);
        first.tick(now);
        second.tick(now);
        assert_eq!(
            first.telemetry(),
            second.telemetry(),
            "telemetry diverged at tick {i}"
        );
    }
}

#[test]
fn stop_all_message_blocks_and_resume_recovers() {
    let mut supervisor = Supervisor::new(&open_map(), config());
    let a = AgentId::new("A");
    supervisor.spawn_agent("A", cell_center(0, 0)).unwrap();
    supervisor.enqueue_waypoint(&a, cell_center(4, 0)).unwrap();

    supervisor.tick(Duration::from_secs(1));
    supervisor.apply(InboundMessage::StopAll, Duration::from_secs(1));
    assert_eq!(supervisor.agent_state(&a), Some(AgentState::Blocked));

    let frozen_step = supervisor.global_step();
    for i in 2..=4 {
        let report = supervisor.tick(Duration::from_secs(i));
        assert!(!report.advanced);
    }
    assert_eq!(supervisor.global_step(), frozen_step);

    supervisor.apply(InboundMessage::Resume, Duration::from_secs(5));
    run(&mut supervisor, 5..=20);
    assert_eq!(supervisor.telemetry().agents[&a].cell, CellCoord::new(4, 0));
}
