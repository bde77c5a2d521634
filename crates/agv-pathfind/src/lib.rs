//! Single-agent path search for AGV fleet coordination.
//!
//! This crate provides a deterministic A* over [`agv_grid::CellGrid`]:
//!
//! - **4-connected** movement only; cost `10 × traversal_cost` per step
//! - **Transient block overlay**: conflict resolution passes the cells to
//!   avoid per call, and the shared grid is never mutated
//! - **Bounded**: a configurable expansion cap turns pathological searches
//!   into a recoverable [`agv_types::PlanningError::SearchExhausted`]
//! - **Deterministic**: the open set orders on `(f, h, insertion order)`,
//!   so identical inputs always yield identical paths
//!
//! # Quick Start
//!
//! ```
//! use agv_grid::{CellCoord, CellGrid};
//! use agv_pathfind::GridAStar;
//! use agv_types::PlannerConfig;
//! use hashbrown::HashSet;
//!
//! let mut grid = CellGrid::new(10, 10, 1.0);
//! grid.set_walkable(CellCoord::new(1, 0), false);
//!
//! let planner = GridAStar::new(&grid, PlannerConfig::default());
//! let path = planner
//!     .find(CellCoord::new(0, 0), CellCoord::new(2, 0), &HashSet::new())
//!     .expect("path around the blocked cell");
//!
//! assert!(path.is_contiguous());
//! assert!(!path.cells().contains(&CellCoord::new(1, 0)));
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod astar;
pub mod heuristics;

pub use astar::{GridAStar, find_path};
pub use heuristics::{STEP_COST, step_heuristic};
