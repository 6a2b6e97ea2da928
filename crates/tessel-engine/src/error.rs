//! The node-level error type.

use std::error::Error;
use std::fmt;

use tessel_core::{GridError, WorkerId};
use tessel_exchange::{ExchangeError, TransportError};
use tessel_space::{PartitionError, TopologyError};
use tessel_wire::WireError;

use crate::config::ConfigError;
use crate::node::NodeState;

/// Errors raised while running a node.
///
/// Every variant is fatal for the run.
#[derive(Debug)]
pub enum NodeError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// The partition table could not be built.
    Partition(PartitionError),
    /// Neighbor resolution failed.
    Topology(TopologyError),
    /// A grid block did not fit.
    Grid(GridError),
    /// A frame could not be encoded or decoded.
    Wire(WireError),
    /// The transport failed.
    Transport(TransportError),
    /// The halo or particle exchange failed.
    Exchange(ExchangeError),
    /// An operation was called in a state that does not allow it.
    InvalidState {
        /// The operation.
        operation: &'static str,
        /// The state the node was in.
        state: NodeState,
    },
    /// The group that formed is not the configured size.
    GroupSizeMismatch {
        /// Configured partition count.
        configured: usize,
        /// Members in the group.
        joined: usize,
    },
    /// The distribution message never arrived.
    ProblemLost,
    /// Collection was attempted before the problem was distributed.
    NotDistributed,
    /// Collection finished without a reply from this worker.
    MissingResults {
        /// The silent worker.
        worker: WorkerId,
    },
    /// A result message could not be accepted.
    BadResults {
        /// The sending worker, if it could be decoded.
        worker: Option<WorkerId>,
        /// Description of the problem.
        detail: String,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Exchange(e) => write!(f, "exchange: {e}"),
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not allowed while {state}")
            }
            Self::GroupSizeMismatch { configured, joined } => {
                write!(f, "configured for {configured} partitions but {joined} workers joined")
            }
            Self::ProblemLost => write!(f, "distribution channel closed before the problem arrived"),
            Self::NotDistributed => write!(f, "nothing has been distributed yet"),
            Self::MissingResults { worker } => write!(f, "no results from worker {worker}"),
            Self::BadResults { worker, detail } => match worker {
                Some(w) => write!(f, "bad results from worker {w}: {detail}"),
                None => write!(f, "bad results: {detail}"),
            },
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Partition(e) => Some(e),
            Self::Topology(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Exchange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for NodeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PartitionError> for NodeError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

impl From<TopologyError> for NodeError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<GridError> for NodeError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<WireError> for NodeError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<TransportError> for NodeError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ExchangeError> for NodeError {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}
