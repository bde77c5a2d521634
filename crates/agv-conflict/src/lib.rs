//! Conflict detection and resolution for AGV fleet plans.
//!
//! Given the committed per-agent paths, this crate finds every
//! spatio-temporal conflict between them and rewrites the plans until the
//! set is clean:
//!
//! - [`detect_conflicts`] - pure pass producing an ordered list of vertex,
//!   swap, and warehouse-exclusion conflicts
//! - [`enumerate_scenarios`] - candidate partial reassignments for one
//!   conflict (all-avoid, one-allowed, wait-permutations), capped by a
//!   configurable bound
//! - [`resolve_conflicts`] - scored scenario selection with recursive
//!   repair under a depth cap
//!
//! Everything here is deterministic: identical inputs produce identical
//! conflict lists, identical scenario orderings, and identical resolved
//! plans.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use agv_grid::{CellCoord, CellGrid};
//! use agv_conflict::{WarehouseContext, detect_conflicts, resolve_conflicts};
//! use agv_types::{AgentId, CellPath, PlannerConfig, ResolverConfig};
//!
//! let grid = CellGrid::new(10, 10, 1.0);
//! let mut assignments = BTreeMap::new();
//! assignments.insert(
//!     AgentId::new("A"),
//!     CellPath::from_cells(vec![
//!         CellCoord::new(0, 1),
//!         CellCoord::new(1, 1),
//!         CellCoord::new(2, 1),
//!     ])
//!     .unwrap(),
//! );
//! assignments.insert(
//!     AgentId::new("B"),
//!     CellPath::from_cells(vec![
//!         CellCoord::new(1, 0),
//!         CellCoord::new(1, 1),
//!         CellCoord::new(1, 2),
//!     ])
//!     .unwrap(),
//! );
//!
//! let ctx = WarehouseContext::empty();
//! assert_eq!(detect_conflicts(&grid, &assignments, &ctx).len(), 1);
//!
//! let resolution = resolve_conflicts(
//!     &grid,
//!     &assignments,
//!     &ctx,
//!     &ResolverConfig::default(),
//!     &PlannerConfig::default(),
//! );
//! assert!(resolution.is_clean());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod detect;
mod resolve;
mod scenario;

pub use detect::{WarehouseContext, detect_conflicts};
pub use resolve::{Resolution, resolve_conflicts};
pub use scenario::{Scenario, avoidance_cells, enumerate_scenarios};
