//! Cell storage with a ghost margin around the owned cells.
//!
//! A [`CellGrid`] of `nx x ny` cells stores `(nx + 2m) x (ny + 2m)` values,
//! where `m` is [`GHOST_MARGIN`]. Owned cells have indices
//! `0..nx x 0..ny`; the margin ring (indices `-m` and `nx..nx + m - 1`)
//! holds ghost copies of neighboring partitions' cells, or physical
//! boundary values where the grid touches the global edge.

use crate::error::GridError;
use crate::geom::{CellIndex, IntBox};

/// Width of the ghost ring around every grid, in cells.
pub const GHOST_MARGIN: i32 = 1;

/// How many cells a particle's interpolation stencil reaches past its
/// own cell. Determines the width of the border region that is sent to
/// neighbors.
pub const INTERPOLATION_RADIUS: i32 = 1;

/// A 2D grid of cells surrounded by a [`GHOST_MARGIN`]-wide ring.
#[derive(Clone, Debug, PartialEq)]
pub struct CellGrid<C> {
    nx: i32,
    ny: i32,
    cell_width: f64,
    cell_height: f64,
    cells: Vec<C>,
}

impl<C: Clone> CellGrid<C> {
    /// Create a grid of `nx x ny` owned cells, every cell (margin
    /// included) initialised to `fill`.
    pub fn new(
        nx: i32,
        ny: i32,
        cell_width: f64,
        cell_height: f64,
        fill: C,
    ) -> Result<Self, GridError> {
        if nx <= 0 || ny <= 0 {
            return Err(GridError::EmptyGrid { nx, ny });
        }
        let len = ((nx + 2 * GHOST_MARGIN) * (ny + 2 * GHOST_MARGIN)) as usize;
        Ok(Self {
            nx,
            ny,
            cell_width,
            cell_height,
            cells: vec![fill; len],
        })
    }

    /// Build a grid from a block of cells covering
    /// [`storage_box`](Self::storage_box), in x-major order.
    pub fn from_block(
        nx: i32,
        ny: i32,
        cell_width: f64,
        cell_height: f64,
        cells: Vec<C>,
    ) -> Result<Self, GridError> {
        if nx <= 0 || ny <= 0 {
            return Err(GridError::EmptyGrid { nx, ny });
        }
        let expected = ((nx + 2 * GHOST_MARGIN) * (ny + 2 * GHOST_MARGIN)) as usize;
        if cells.len() != expected {
            return Err(GridError::BlockSizeMismatch {
                expected,
                got: cells.len(),
            });
        }
        Ok(Self {
            nx,
            ny,
            cell_width,
            cell_height,
            cells,
        })
    }

    /// Copy out the cells of `area` in x-major order.
    pub fn block(&self, area: &IntBox) -> Result<Vec<C>, GridError> {
        let mut out = Vec::with_capacity(area.cell_count());
        for idx in area.cells() {
            out.push(self.get(idx.x, idx.y).cloned().ok_or_else(|| self.out_of_range(idx))?);
        }
        Ok(out)
    }

    /// Overwrite the cells of `area` with `cells`, given in x-major order.
    pub fn paste(&mut self, area: &IntBox, cells: Vec<C>) -> Result<(), GridError> {
        if cells.len() != area.cell_count() {
            return Err(GridError::BlockSizeMismatch {
                expected: area.cell_count(),
                got: cells.len(),
            });
        }
        for (idx, cell) in area.cells().zip(cells) {
            match self.offset(idx.x, idx.y) {
                Some(i) => self.cells[i] = cell,
                None => return Err(self.out_of_range(idx)),
            }
        }
        Ok(())
    }
}

impl<C> CellGrid<C> {
    /// Owned cells along x.
    pub fn nx(&self) -> i32 {
        self.nx
    }

    /// Owned cells along y.
    pub fn ny(&self) -> i32 {
        self.ny
    }

    /// Width of one cell in particle units.
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Height of one cell in particle units.
    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    /// The owned cells, `[0, nx - 1] x [0, ny - 1]`.
    pub fn owned_box(&self) -> IntBox {
        IntBox::new(0, self.nx - 1, 0, self.ny - 1)
    }

    /// Every addressable cell, margin included.
    pub fn storage_box(&self) -> IntBox {
        self.owned_box().grow(GHOST_MARGIN)
    }

    /// Whether `(x, y)` is addressable (owned or margin).
    pub fn in_range(&self, x: i32, y: i32) -> bool {
        self.storage_box().contains(x, y)
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.in_range(x, y) {
            return None;
        }
        let rows = self.ny + 2 * GHOST_MARGIN;
        Some(((x + GHOST_MARGIN) * rows + (y + GHOST_MARGIN)) as usize)
    }

    fn out_of_range(&self, index: CellIndex) -> GridError {
        GridError::OutOfRange {
            index,
            bounds: format!("{}", self.storage_box()),
        }
    }

    /// The cell at `(x, y)`, or `None` outside the margin.
    pub fn get(&self, x: i32, y: i32) -> Option<&C> {
        self.offset(x, y).map(|i| &self.cells[i])
    }

    /// Mutable access to the cell at `(x, y)`, or `None` outside the margin.
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut C> {
        self.offset(x, y).map(move |i| &mut self.cells[i])
    }

    /// The cell at `index`, or an [`GridError::OutOfRange`].
    pub fn cell(&self, index: CellIndex) -> Result<&C, GridError> {
        match self.offset(index.x, index.y) {
            Some(i) => Ok(&self.cells[i]),
            None => Err(self.out_of_range(index)),
        }
    }

    /// Mutable access to the cell at `index`, or an [`GridError::OutOfRange`].
    pub fn cell_mut(&mut self, index: CellIndex) -> Result<&mut C, GridError> {
        match self.offset(index.x, index.y) {
            Some(i) => Ok(&mut self.cells[i]),
            None => Err(self.out_of_range(index)),
        }
    }

    /// Replace the cell at `index`.
    pub fn set(&mut self, index: CellIndex, cell: C) -> Result<(), GridError> {
        *self.cell_mut(index)? = cell;
        Ok(())
    }

    /// Iterate `(index, cell)` over every addressable cell in x-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &C)> {
        self.storage_box().cells().zip(self.cells.iter())
    }

    /// Iterate mutably over every addressable cell in x-major order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CellIndex, &mut C)> {
        self.storage_box().cells().zip(self.cells.iter_mut())
    }
}
