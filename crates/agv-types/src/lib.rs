//! Shared domain types for AGV fleet coordination.
//!
//! This crate defines the vocabulary the planning and coordination crates
//! speak:
//!
//! - [`AgentId`] - fleet-wide agent identity
//! - [`CellPath`] / [`Assignments`] - planned cell sequences, with
//!   wait-in-place encoded as repeated cells
//! - [`Conflict`] / [`ConflictKind`] - vertex, swap, and
//!   warehouse-exclusion conflicts between plans
//! - [`PlannerConfig`] / [`ResolverConfig`] - resource bounds for search
//!   and resolution
//! - [`PlanningError`] - the planner failure taxonomy
//!
//! All types order deterministically; plan-level reproducibility across
//! runs rests on that.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod agent;
mod config;
mod conflict;
mod error;
mod path;

pub use agent::AgentId;
pub use config::{PlannerConfig, ResolverConfig};
pub use conflict::{Conflict, ConflictKind, WAREHOUSE_STEP};
pub use error::PlanningError;
pub use path::{Assignments, CellPath};
