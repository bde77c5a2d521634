//! Error types for grid construction and mutation.

/// Errors produced while constructing or mutating a [`crate::CellGrid`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// The grid was given a zero-sized dimension.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
    },

    /// The cell size is not a positive, finite number.
    #[error("invalid cell size {0}")]
    InvalidCellSize(f64),

    /// A referenced cell lies outside the grid bounds.
    #[error("cell ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// X coordinate of the offending cell.
        x: i32,
        /// Y coordinate of the offending cell.
        y: i32,
    },
}

impl GridError {
    /// Creates an out-of-bounds error for the given coordinate.
    #[must_use]
    pub const fn out_of_bounds(coord: crate::CellCoord) -> Self {
        Self::OutOfBounds {
            x: coord.x,
            y: coord.y,
        }
    }
}
