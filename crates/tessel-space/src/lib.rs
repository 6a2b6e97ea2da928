//! Spatial topology of a decomposed simulation grid.
//!
//! This crate answers "who owns the space next to me?" for every worker
//! of a distributed run. It has no I/O of its own.
//!
//! - [`SimplePartitioner`] splits the global grid into a validated
//!   [`PartitionTable`].
//! - [`BoundaryRegion`] and [`BorderRegion`] classify points around and
//!   inside a partition (3x3 and 5x5 compass codes).
//! - [`NeighborMap`] resolves every region to neighbor worker IDs,
//!   direction vectors and frame offsets under a [`BoundaryType`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod edge;
pub mod error;
pub mod neighbor;
pub mod partition;
pub mod region;

pub use edge::BoundaryType;
pub use error::{PartitionError, TopologyError};
pub use neighbor::{communication_peers, DirectionList, NeighborList, NeighborMap, OffsetList};
pub use partition::{PartitionTable, Partitioner, SimplePartitioner};
pub use region::{Band, BorderRegion, BoundaryRegion, Side};
