//! Vehicles and the per-agent state machine.
//!
//! The supervisor owns its agents and talks to the vehicle hardware (or a
//! simulation of it) through the [`Vehicle`] trait. A vehicle executes one
//! single-cell move at a time and reports completion through a
//! [`MoveTicket`]; all planning and conflict handling stays on the
//! supervisor side.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nalgebra::Point2;

use agv_types::CellPath;

/// Coordination state of an agent.
///
/// The lifecycle is `Idle → WaitingForStep → Moving → (WaitingForStep |
/// WaitingAtTarget) → Idle`; `Blocked` is entered on external stop
/// requests and left on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AgentState {
    /// No path assigned; eligible for dispatch.
    Idle,
    /// Path assigned, ready for the next lockstep advance.
    WaitingForStep,
    /// Executing a single-cell move.
    Moving,
    /// Path finished; holding position at the waypoint.
    WaitingAtTarget,
    /// Stopped by an external request.
    Blocked,
}

/// Completion handle for a single-cell move.
///
/// The vehicle keeps the completing side; the supervisor polls
/// [`MoveTicket::is_complete`] before the next lockstep gate can pass.
#[derive(Debug, Clone, Default)]
pub struct MoveTicket {
    done: Arc<AtomicBool>,
}

impl MoveTicket {
    /// Creates an outstanding ticket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ticket that is already complete.
    #[must_use]
    pub fn completed() -> Self {
        let ticket = Self::new();
        ticket.complete();
        ticket
    }

    /// Marks the move as finished.
    pub fn complete(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Returns `true` once the move has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Cardinal heading of a vehicle, tracked from its last completed move.
///
/// Dynamic-obstacle reports arrive as offsets in the reporter's local
/// forward/right frame; the heading rotates them into grid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Heading {
    /// Facing +y.
    #[default]
    North,
    /// Facing +x.
    East,
    /// Facing -y.
    South,
    /// Facing -x.
    West,
}

impl Heading {
    /// Rotates a local `(right, forward)` offset into a grid `(dx, dy)`
    /// offset.
    ///
    /// # Example
    ///
    /// ```
    /// use agv_supervisor::Heading;
    ///
    /// // One cell dead ahead
    /// assert_eq!(Heading::North.to_grid_offset(0, 1), (0, 1));
    /// assert_eq!(Heading::East.to_grid_offset(0, 1), (1, 0));
    /// assert_eq!(Heading::South.to_grid_offset(0, 1), (0, -1));
    /// assert_eq!(Heading::West.to_grid_offset(0, 1), (-1, 0));
    /// ```
    #[must_use]
    pub const fn to_grid_offset(self, right: i32, forward: i32) -> (i32, i32) {
        match self {
            Self::North => (right, forward),
            Self::East => (forward, -right),
            Self::South => (-right, -forward),
            Self::West => (-forward, right),
        }
    }

    /// Heading implied by a world-space displacement, if it is dominant
    /// along one axis.
    #[must_use]
    pub fn from_displacement(dx: f64, dy: f64) -> Option<Self> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0.0 { Self::East } else { Self::West })
        } else {
            Some(if dy > 0.0 { Self::North } else { Self::South })
        }
    }
}

/// The capability set the supervisor needs from a vehicle.
///
/// One concrete kind exists today ([`AgvVehicle`]); the trait is the seam
/// future vehicle kinds plug into.
pub trait Vehicle: Send {
    /// Hands the vehicle its newly assigned path. Informational — the
    /// vehicle does not plan; moves are issued one cell at a time.
    fn assign_path(&mut self, path: &CellPath);

    /// Starts the kinematic move to `target` (a world-space cell centre).
    /// The returned ticket completes when the vehicle has arrived.
    fn advance_one_cell(&mut self, target: Point2<f64>) -> MoveTicket;

    /// Current world-space position.
    fn current_position(&self) -> Point2<f64>;

    /// Current heading, from the last completed move.
    fn heading(&self) -> Heading;

    /// Advances the vehicle's internal motion by `dt`. The cooperative
    /// replacement for a per-vehicle motion task: the driver calls this
    /// once per tick.
    fn update(&mut self, dt: Duration);
}

/// A simulated AGV: straight-line motion between cell centres at a fixed
/// speed.
#[derive(Debug)]
pub struct AgvVehicle {
    position: Point2<f64>,
    heading: Heading,
    speed: f64,
    pending: Option<PendingMove>,
}

#[derive(Debug)]
struct PendingMove {
    target: Point2<f64>,
    ticket: MoveTicket,
}

impl AgvVehicle {
    /// Default speed in world units per second.
    pub const DEFAULT_SPEED: f64 = 2.0;

    /// Creates a vehicle at the given world position.
    #[must_use]
    pub fn new(position: Point2<f64>) -> Self {
        Self::with_speed(position, Self::DEFAULT_SPEED)
    }

    /// Creates a vehicle with an explicit speed (world units per second).
    #[must_use]
    pub fn with_speed(position: Point2<f64>, speed: f64) -> Self {
        Self {
            position,
            heading: Heading::default(),
            speed: speed.abs().max(f64::EPSILON),
            pending: None,
        }
    }

    /// Returns `true` while a move is in flight.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.pending.is_some()
    }
}

impl Vehicle for AgvVehicle {
    fn assign_path(&mut self, _path: &CellPath) {}

    fn advance_one_cell(&mut self, target: Point2<f64>) -> MoveTicket {
        let ticket = MoveTicket::new();
        self.pending = Some(PendingMove {
            target,
            ticket: ticket.clone(),
        });
        ticket
    }

    fn current_position(&self) -> Point2<f64> {
        self.position
    }

    fn heading(&self) -> Heading {
        self.heading
    }

    fn update(&mut self, dt: Duration) {
        let Some(target) = self.pending.as_ref().map(|p| p.target) else {
            return;
        };
        let to_target = target - self.position;
        let distance = to_target.norm();
        let reach = self.speed * dt.as_secs_f64();

        if reach >= distance {
            if let Some(heading) = Heading::from_displacement(to_target.x, to_target.y) {
                self.heading = heading;
            }
            self.position = target;
            if let Some(pending) = self.pending.take() {
                pending.ticket.complete();
            }
        } else if distance > 0.0 {
            self.position += to_target * (reach / distance);
        }
    }
}
