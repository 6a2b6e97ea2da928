//! The transport seam: how frames move between workers.
//!
//! A transport provides, per ordered pair of workers, a reliable,
//! order-preserving, asynchronous one-way channel, plus the leader's
//! one-to-many distribution channel and the many-to-one results
//! channel. Channels are addressed by destination worker and
//! [`PortKind`]. Each received frame is handed, in send order, to the
//! single handler registered for that port, on a transport-owned thread.

use std::fmt;
use std::sync::Arc;

use tessel_core::WorkerId;

use crate::error::TransportError;

/// Callback invoked once per received frame, or once with the error
/// that ended delivery on the port.
pub type FrameHandler = Box<dyn FnMut(Result<Vec<u8>, TransportError>) + Send>;

/// Names a receive port on a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Halo and particle traffic from one neighbor.
    Exchange {
        /// The sending neighbor.
        from: WorkerId,
    },
    /// The leader's distribution message.
    Problem,
    /// Workers' results, received by the leader.
    Results,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange { from } => write!(f, "exchange-from-{from}"),
            Self::Problem => write!(f, "problem"),
            Self::Results => write!(f, "results"),
        }
    }
}

/// Sending half of a channel. Dropping it closes the channel end.
pub trait SendPort: Send {
    /// Queue one complete frame for delivery.
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Close this end. Frames already sent are still delivered; later
    /// sends fail with [`TransportError::Closed`].
    fn close(&mut self);
}

/// Receiving half of a channel with its delivery thread.
pub trait ReceivePort: Send {
    /// Deliver any frames already queued, then stop the delivery thread
    /// and wait for it to exit.
    fn close(&mut self);
}

/// A worker's endpoint into the group.
pub trait Transport: Send + Sync {
    /// This worker's ID.
    fn worker(&self) -> WorkerId;

    /// Number of workers in the group.
    fn members(&self) -> usize;

    /// The elected leader.
    fn leader(&self) -> WorkerId;

    /// Whether this worker is the leader.
    fn is_leader(&self) -> bool {
        self.worker() == self.leader()
    }

    /// Start delivering frames sent to this worker's `port` to `handler`.
    fn receive(
        &self,
        port: PortKind,
        handler: FrameHandler,
    ) -> Result<Box<dyn ReceivePort>, TransportError>;

    /// Open a channel to `port` on worker `to`.
    fn connect(&self, to: WorkerId, port: PortKind) -> Result<Box<dyn SendPort>, TransportError>;
}

/// Result of joining a group.
pub struct Membership {
    /// The ID assigned to this member.
    pub worker: WorkerId,
    /// The elected leader: the lowest ID.
    pub leader: WorkerId,
    /// The member's transport endpoint.
    pub transport: Arc<dyn Transport>,
}

impl Membership {
    /// Whether this member is the leader.
    pub fn is_leader(&self) -> bool {
        self.worker == self.leader
    }
}

/// Group membership: how a node finds its peers.
pub trait Rendezvous: Send + Sync {
    /// Join the group, blocking until it is complete.
    fn join(&self) -> Result<Membership, TransportError>;

    /// Tear the group down. Called by the leader once every member has
    /// closed its channels.
    fn terminate(&self);

    /// Abort the group after a local failure. Every member's handlers
    /// receive [`TransportError::Aborted`], so peers blocked on this
    /// member's traffic fail instead of waiting forever.
    fn abort(&self);
}
