//! The physics seam.
//!
//! The field solver, particle pusher and interpolation scheme live
//! outside this workspace. A [`Physics`] implementation supplies them and
//! calls back into the exchange at the points its step algorithm defines.

use tessel_core::{Cell, CellGrid, IntBox, Particle, WorkerId};
use tessel_exchange::{ExchangeError, SharedDataManager};
use tessel_space::BoundaryType;
use tessel_wire::Wire;

/// Size of the global grid and of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
    /// Cells along x.
    pub nx: i32,
    /// Cells along y.
    pub ny: i32,
    /// Width of one cell in particle units.
    pub cell_width: f64,
    /// Height of one cell in particle units.
    pub cell_height: f64,
}

impl GridSettings {
    /// The global box in cell coordinates.
    pub fn global_box(&self) -> IntBox {
        IntBox::new(0, self.nx - 1, 0, self.ny - 1)
    }

    /// `(cell_width, cell_height)`.
    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }
}

/// An un-partitioned simulation state in the global frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalState<C, P> {
    /// The global grid, margin included.
    pub grid: CellGrid<C>,
    /// Every particle.
    pub particles: Vec<P>,
}

/// One worker's slice of the simulation, in its local frame.
#[derive(Debug)]
pub struct LocalState<C, P> {
    /// The owning worker.
    pub worker: WorkerId,
    /// The partition in global cell coordinates.
    pub partition: IntBox,
    /// Boundary condition at the global edge.
    pub boundary: BoundaryType,
    /// Local grid; cell `(0, 0)` is the partition's lower-left cell.
    pub grid: CellGrid<C>,
    /// Particles owned by the worker.
    pub particles: Vec<P>,
}

/// The physics collaborator.
///
/// Every node of a group holds its own instance. Only the leader calls
/// [`initial_state`](Physics::initial_state) and
/// [`prepare`](Physics::prepare); every node calls
/// [`step`](Physics::step) on its own slice.
pub trait Physics: Send {
    /// Cell payload.
    type Cell: Cell + Wire;
    /// Particle payload.
    type Particle: Particle + Wire;

    /// The global grid and cell size.
    fn settings(&self) -> GridSettings;

    /// The initial problem, in the global frame.
    fn initial_state(&mut self) -> GlobalState<Self::Cell, Self::Particle>;

    /// The leader's initial interpolation and solve on the whole state,
    /// run before it is partitioned.
    fn prepare(
        &mut self,
        state: &mut GlobalState<Self::Cell, Self::Particle>,
        boundary: BoundaryType,
    );

    /// Advance one slice by one step, exchanging halo data through
    /// `exchange`.
    fn step(
        &mut self,
        state: &mut LocalState<Self::Cell, Self::Particle>,
        exchange: &mut SharedDataManager<Self::Cell, Self::Particle>,
    ) -> Result<(), ExchangeError>;
}
