//! Tessel: domain decomposition for 2D particle-in-cell simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Tessel sub-crates. Most users only need `tessel` as a single dependency.
//!
//! # Quick start
//!
//! ```rust
//! use tessel::prelude::*;
//!
//! // Split a 32x16 grid among four workers and look up who surrounds worker 0.
//! let table = SimplePartitioner.partition(32, 16, 4).unwrap();
//! assert_eq!(table.len(), 4);
//! assert_eq!(table.owner_of(0, 0), Some(WorkerId(0)));
//!
//! let map = NeighborMap::new(WorkerId(0), &table, BoundaryType::Periodic).unwrap();
//! assert_eq!(map.partition(), *table.get(WorkerId(0)).unwrap());
//! assert!(!map.neighbors().is_empty());
//! ```
//!
//! A full run plugs a [`prelude::Physics`] implementation into one
//! [`prelude::Node`] per worker, all joined through a [`prelude::Rendezvous`]
//! such as [`prelude::LocalCluster`].
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessel-core` | Boxes, cell grids, worker IDs, gates, cell and particle traits |
//! | [`space`] | `tessel-space` | Partitioning, region codes, boundary types, neighbor maps |
//! | [`wire`] | `tessel-wire` | Binary frames and messages exchanged between workers |
//! | [`exchange`] | `tessel-exchange` | Transports, halo cell and particle exchange |
//! | [`engine`] | `tessel-engine` | Nodes, the master and worker roles, the physics trait |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core geometry, cell storage, and synchronization (`tessel-core`).
///
/// Includes [`types::IntBox`], [`types::CellGrid`], and the
/// [`types::Gate`] and [`types::CountingBarrier`] primitives.
pub use tessel_core as types;

/// Partitioning and neighbor topology (`tessel-space`).
///
/// [`space::SimplePartitioner`] splits the global grid;
/// [`space::NeighborMap`] tells a worker who owns the cells around it.
pub use tessel_space as space;

/// Wire encoding (`tessel-wire`).
///
/// Cells and particles implement [`wire::Wire`] to travel between workers.
pub use tessel_wire as wire;

/// Halo and particle exchange (`tessel-exchange`).
///
/// [`exchange::SharedDataManager`] drives one worker's exchanges over any
/// [`exchange::Transport`].
pub use tessel_exchange as exchange;

/// Distributed run orchestration (`tessel-engine`).
pub use tessel_engine as engine;

/// Common imports for typical Tessel usage.
///
/// ```rust
/// use tessel::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use tessel_core::{Cell, CellGrid, CellIndex, Direction, IntBox, Particle, RealBox, WorkerId};

    // Space
    pub use tessel_space::{BoundaryType, NeighborMap, PartitionTable, Partitioner, SimplePartitioner};

    // Wire
    pub use tessel_wire::Wire;

    // Exchange
    pub use tessel_exchange::{
        Disposition, LocalCluster, Membership, Rendezvous, SharedDataManager, Transport,
    };

    // Errors
    pub use tessel_engine::{ConfigError, NodeError};
    pub use tessel_exchange::{ExchangeError, TransportError};

    // Engine
    pub use tessel_engine::{GlobalState, GridSettings, LocalState, Node, NodeConfig, NodeState, Physics};
}
