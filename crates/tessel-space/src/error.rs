//! Error types for partitioning and topology resolution.

use std::error::Error;
use std::fmt;

use tessel_core::{IntBox, WorkerId};

use crate::region::BorderRegion;

/// Errors arising from building a [`PartitionTable`](crate::PartitionTable).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// Zero partitions were requested.
    NoPartitions,
    /// The partitioner only supports powers of two.
    NotPowerOfTwo {
        /// The requested count.
        count: usize,
    },
    /// A partition would be narrower than the minimum along some axis.
    PartitionTooSmall {
        /// The offending partition.
        partition: IntBox,
        /// Minimum number of cells per axis.
        min_cells: i32,
    },
    /// A partition reaches outside the global box.
    OutsideGlobal {
        /// The offending partition.
        partition: IntBox,
        /// The global box.
        global: IntBox,
    },
    /// Two partitions share cells.
    Overlap {
        /// First partition's owner.
        a: WorkerId,
        /// Second partition's owner.
        b: WorkerId,
    },
    /// Two partitions share part of a row or column band without
    /// sharing all of it, so the table is not a lattice.
    Misaligned {
        /// First partition's owner.
        a: WorkerId,
        /// Second partition's owner.
        b: WorkerId,
    },
    /// The partitions leave some global cells unowned.
    IncompleteCover {
        /// Cells covered by the table.
        covered: usize,
        /// Cells in the global box.
        expected: usize,
    },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPartitions => write!(f, "at least one partition is required"),
            Self::NotPowerOfTwo { count } => {
                write!(f, "partition count {count} is not a power of two")
            }
            Self::PartitionTooSmall {
                partition,
                min_cells,
            } => write!(
                f,
                "partition {partition} has fewer than {min_cells} cells along an axis"
            ),
            Self::OutsideGlobal { partition, global } => {
                write!(f, "partition {partition} reaches outside global box {global}")
            }
            Self::Overlap { a, b } => write!(f, "partitions {a} and {b} overlap"),
            Self::Misaligned { a, b } => {
                write!(f, "partitions {a} and {b} are not aligned to a common lattice")
            }
            Self::IncompleteCover { covered, expected } => {
                write!(f, "partitions cover {covered} of {expected} cells")
            }
        }
    }
}

impl Error for PartitionError {}

/// Errors arising from [`NeighborMap`](crate::NeighborMap) construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// The worker is not part of the partition table.
    UnknownWorker {
        /// The worker that was asked for.
        worker: WorkerId,
        /// Number of partitions in the table.
        partitions: usize,
    },
    /// Under periodic boundaries every probe point must have an owner.
    UnresolvedProbe {
        /// The worker whose map was being built.
        worker: WorkerId,
        /// The probe point after wrapping.
        x: i32,
        /// The probe point after wrapping.
        y: i32,
    },
    /// An outside corner was given a neighbor although the diagonal
    /// neighbor of the same corner exists.
    PrecedenceConflict {
        /// The worker whose map was being built.
        worker: WorkerId,
        /// The outside-corner region holding the extra neighbor.
        region: BorderRegion,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWorker { worker, partitions } => {
                write!(f, "worker {worker} not in a table of {partitions} partitions")
            }
            Self::UnresolvedProbe { worker, x, y } => write!(
                f,
                "periodic probe ({x}, {y}) of worker {worker} has no owning partition"
            ),
            Self::PrecedenceConflict { worker, region } => write!(
                f,
                "worker {worker} sends {region:?} although its diagonal neighbor exists"
            ),
        }
    }
}

impl Error for TopologyError {}
