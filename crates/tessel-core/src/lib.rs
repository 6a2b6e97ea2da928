//! Core types for the Tessel domain-decomposition layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Tessel crate: worker IDs,
//! integer and real boxes, the ghost-margin cell grid, the traits the
//! physics collaborator implements for its cells and particles, and the
//! two synchronization primitives used for every cross-thread handoff.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geom;
pub mod grid;
pub mod id;
pub mod sync;
pub mod traits;

pub use error::GridError;
pub use geom::{CellIndex, Direction, IntBox, RealBox};
pub use grid::{CellGrid, GHOST_MARGIN, INTERPOLATION_RADIUS};
pub use id::WorkerId;
pub use sync::{CountingBarrier, Gate};
pub use traits::{Cell, Particle};
