//! Halo cell and particle exchange between neighboring workers.
//!
//! Each worker owns one [`SharedDataManager`], which owns one
//! [`SharedData`] per neighbor. The manager runs the per-step protocol
//! the physics collaborator calls into:
//!
//! 1. [`start_exchange_of_particles`](SharedDataManager::start_exchange_of_particles)
//!    spawns a helper thread that sends leaving particles, waits for
//!    every neighbor's arriving particles, then sends border particles.
//! 2. [`arriving_particles`](SharedDataManager::arriving_particles) and
//!    [`ghost_particles`](SharedDataManager::ghost_particles) block until
//!    the neighbors' batches are in.
//! 3. [`exchange_cells`](SharedDataManager::exchange_cells) and
//!    [`wait_for_ghost_cells`](SharedDataManager::wait_for_ghost_cells)
//!    refresh the ghost margin of the local grid by copy.
//! 4. The two clean-up calls rearm everything for the next step.
//!
//! Messages travel over a [`Transport`]; [`LocalCluster`] provides an
//! in-process implementation on crossbeam channels.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cells;
pub mod error;
pub mod gates;
pub mod handler;
pub mod interpolation;
pub mod local;
pub mod manager;
pub mod shared;
pub mod transport;

pub use cells::{border_cell_plan, BorderCell};
pub use error::{ExchangeError, TransportError};
pub use gates::{Disposition, ParticleGates};
pub use handler::{dispatch, CellBatchHandler, IndexMapHandler, ParticleBatchHandler};
pub use interpolation::{interpolate_to_grid, interpolate_to_particles};
pub use local::LocalCluster;
pub use manager::SharedDataManager;
pub use shared::SharedData;
pub use transport::{
    FrameHandler, Membership, PortKind, ReceivePort, Rendezvous, SendPort, Transport,
};
