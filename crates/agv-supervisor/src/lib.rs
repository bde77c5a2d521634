//! Central supervisor for AGV fleet coordination.
//!
//! A single [`Supervisor`] owns the authoritative plan: it dispatches
//! idle agents, resolves conflicts between committed paths, and releases
//! one node-advance per lockstep tick so that no two agents ever occupy
//! the same cell or swap across the same edge at the same discrete time.
//!
//! # Architecture
//!
//! - **Single-threaded driver**: the tick loop, the planner, and the
//!   conflict resolver run inline on one thread. [`Supervisor::tick`]
//!   takes the current time explicitly, which keeps every timer testable.
//! - **Async boundary**: route requests and obstacle reports arrive over
//!   TCP ([`net::serve`]), are parsed on the listener task, and cross
//!   into the driver through an [`inbox`] drained between ticks.
//! - **Vehicles**: the supervisor drives vehicles one cell at a time
//!   through the [`Vehicle`] trait; a [`MoveTicket`] reports completion
//!   of each move before the next lockstep gate can pass.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use agv_grid::MapDefinition;
//! use agv_supervisor::{Supervisor, SupervisorConfig};
//! use agv_types::AgentId;
//! use nalgebra::Point2;
//!
//! let map = MapDefinition::builder(10, 10)
//!     .target("Depot", Point2::new(5.5, 0.5))
//!     .build()
//!     .unwrap();
//!
//! let mut supervisor = Supervisor::new(&map, SupervisorConfig::default());
//! supervisor.spawn_agent("AUGV_1", Point2::new(0.5, 0.5)).unwrap();
//! supervisor
//!     .enqueue_waypoint(&AgentId::new("AUGV_1"), Point2::new(5.5, 0.5))
//!     .unwrap();
//!
//! let report = supervisor.tick(Duration::from_millis(100));
//! assert!(report.advanced);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod agent;
mod error;
pub mod inbox;
pub mod net;
mod obstacles;
mod supervisor;
mod telemetry;

pub use agent::{AgentState, AgvVehicle, Heading, MoveTicket, Vehicle};
pub use error::{IngestError, SupervisorError};
pub use inbox::{Inbox, InboxSender, InboundMessage, ObstacleReport, RouteRequest, inbox_channel};
pub use obstacles::DynamicObstacles;
pub use supervisor::{LockstepPhase, Supervisor, SupervisorConfig, TickReport};
pub use telemetry::{AgentTelemetry, TelemetrySnapshot};
