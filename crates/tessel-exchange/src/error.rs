//! Error types for transports and the exchange protocol.

use std::error::Error;
use std::fmt;

use tessel_core::{CellIndex, GridError, WorkerId};
use tessel_space::TopologyError;
use tessel_wire::WireError;

use crate::transport::PortKind;

// ── TransportError ──────────────────────────────────────────────

/// Errors raised by a [`Transport`](crate::Transport).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// More members tried to join than the group was created for.
    GroupFull {
        /// Expected group size.
        members: usize,
    },
    /// The addressed worker is not a group member.
    UnknownPeer {
        /// The addressed worker.
        peer: WorkerId,
        /// Group size.
        members: usize,
    },
    /// A handler is already registered for this port.
    AlreadyReceiving {
        /// The port.
        port: PortKind,
    },
    /// The channel behind a send port is gone.
    Closed {
        /// The destination worker.
        peer: WorkerId,
        /// The port.
        port: PortKind,
    },
    /// A delivery thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the failure.
        reason: String,
    },
    /// A member aborted the group.
    Aborted,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupFull { members } => write!(f, "group of {members} members is full"),
            Self::UnknownPeer { peer, members } => {
                write!(f, "worker {peer} is not in a group of {members}")
            }
            Self::AlreadyReceiving { port } => {
                write!(f, "a handler is already registered for {port}")
            }
            Self::Closed { peer, port } => write!(f, "channel {port} to worker {peer} is closed"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "delivery thread spawn failed: {reason}")
            }
            Self::Aborted => write!(f, "group aborted"),
        }
    }
}

impl Error for TransportError {}

// ── ExchangeError ───────────────────────────────────────────────

/// Errors raised by the halo and particle exchange.
///
/// None of these are retried: they abort the run.
#[derive(Debug)]
pub enum ExchangeError {
    /// A frame could not be encoded or decoded.
    Wire(WireError),
    /// The transport failed.
    Transport(TransportError),
    /// A local cell access failed.
    Grid(GridError),
    /// Topology resolution failed.
    Topology(TopologyError),
    /// A ghost-cell batch does not match the bound slots.
    GhostBatchMismatch {
        /// The sending neighbor.
        neighbor: WorkerId,
        /// Number of bound ghost slots.
        expected: usize,
        /// Number of cells received.
        got: usize,
    },
    /// A neighbor's index map points outside the local grid.
    IndexOutOfRange {
        /// The sending neighbor.
        neighbor: WorkerId,
        /// The offending index.
        index: CellIndex,
    },
    /// The channel to a neighbor was used before it was connected.
    NotConnected {
        /// The neighbor.
        neighbor: WorkerId,
    },
    /// A delivery thread failed while handling a neighbor's message.
    Delivery {
        /// The sending neighbor.
        neighbor: WorkerId,
        /// Description of the failure.
        detail: String,
    },
    /// The particle exchange helper thread panicked.
    HelperPanicked,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::GhostBatchMismatch {
                neighbor,
                expected,
                got,
            } => write!(
                f,
                "worker {neighbor} sent {got} ghost cells, {expected} slots are bound"
            ),
            Self::IndexOutOfRange { neighbor, index } => {
                write!(f, "worker {neighbor} mapped a ghost cell to {index}, outside the grid")
            }
            Self::NotConnected { neighbor } => {
                write!(f, "channel to worker {neighbor} is not connected")
            }
            Self::Delivery { neighbor, detail } => {
                write!(f, "delivery from worker {neighbor} failed: {detail}")
            }
            Self::HelperPanicked => write!(f, "particle exchange thread panicked"),
        }
    }
}

impl Error for ExchangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Topology(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WireError> for ExchangeError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<TransportError> for ExchangeError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<GridError> for ExchangeError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<TopologyError> for ExchangeError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}
