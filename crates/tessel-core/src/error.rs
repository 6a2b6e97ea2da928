//! Error types for grid construction and cell access.

use std::error::Error;
use std::fmt;

use crate::geom::CellIndex;

/// Errors arising from [`CellGrid`](crate::CellGrid) construction or access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// A grid dimension was zero or negative.
    EmptyGrid {
        /// Requested cells along x.
        nx: i32,
        /// Requested cells along y.
        ny: i32,
    },
    /// A cell index lies outside the grid, margin included.
    OutOfRange {
        /// The offending index.
        index: CellIndex,
        /// Human-readable description of the valid range.
        bounds: String,
    },
    /// A block of cells did not match the size of its destination.
    BlockSizeMismatch {
        /// Number of cells the destination expects.
        expected: usize,
        /// Number of cells supplied.
        got: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { nx, ny } => {
                write!(f, "grid must have at least one cell, got {nx}x{ny}")
            }
            Self::OutOfRange { index, bounds } => {
                write!(f, "cell {index} out of range: {bounds}")
            }
            Self::BlockSizeMismatch { expected, got } => {
                write!(f, "block holds {got} cells, expected {expected}")
            }
        }
    }
}

impl Error for GridError {}
