//! Grid data model for AGV fleet coordination.
//!
//! This crate provides the spatial foundation the rest of the workspace
//! builds on:
//!
//! - [`CellCoord`] - discrete 2D cell coordinates
//! - [`Cell`] - per-cell walkability and traversal cost
//! - [`CellGrid`] - dense rectangular grid with world↔cell mapping and
//!   scoped temporary blocks
//! - [`MapDefinition`] - startup description of a site (blocked cells,
//!   warehouse anchors, named route targets)
//!
//! # Coordinate Systems
//!
//! World coordinates are continuous `f64` values (`nalgebra::Point2`).
//! Cell coordinates are discrete `i32` values in `[0, width) × [0, height)`.
//! [`CellGrid::cell_at`] converts world → cell by flooring and clamping, so
//! any world point maps to a valid cell.
//!
//! # Example
//!
//! ```
//! use agv_grid::{CellCoord, CellGrid};
//! use nalgebra::Point2;
//!
//! let mut grid = CellGrid::new(10, 10, 1.0);
//! grid.set_walkable(CellCoord::new(5, 5), false);
//!
//! let coord = grid.cell_at(Point2::new(5.4, 5.9));
//! assert_eq!(coord, CellCoord::new(5, 5));
//! assert!(!grid.is_walkable(coord));
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cell;
mod error;
mod grid;
mod map;

pub use cell::{Cell, CellCoord};
pub use error::GridError;
pub use grid::CellGrid;
pub use map::{MapDefinition, MapDefinitionBuilder};

// Re-export nalgebra points for convenience
pub use nalgebra::Point2;
