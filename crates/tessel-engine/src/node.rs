//! One process of a distributed run.
//!
//! A [`Node`] walks a fixed lifecycle:
//!
//! ```text
//! Uninitialized -> Distributing -> Stepping -> Collecting -> Closed
//! ```
//!
//! Every node plays the worker role. The node elected leader also plays
//! the master role: it prepares and splits the problem, and reassembles
//! the results.
//!
//! A node that fails after leaving `Uninitialized` aborts the whole
//! group, so its peers return an error instead of waiting on traffic
//! that will never come.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tessel_exchange::{Membership, Rendezvous};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::master::Master;
use crate::physics::{GlobalState, Physics};
use crate::worker::Worker;

/// Where a [`Node`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Created, not yet joined.
    Uninitialized,
    /// Joining the group and receiving the problem.
    Distributing,
    /// Ready to step.
    Stepping,
    /// Final results sent; only `close` remains.
    Collecting,
    /// Channels closed.
    Closed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Distributing => write!(f, "distributing"),
            Self::Stepping => write!(f, "stepping"),
            Self::Collecting => write!(f, "collecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One process of a distributed run.
pub struct Node<Ph: Physics> {
    config: NodeConfig,
    physics: Ph,
    rendezvous: Arc<dyn Rendezvous>,
    state: NodeState,
    membership: Option<Membership>,
    master: Option<Master<Ph::Cell, Ph::Particle>>,
    worker: Option<Worker<Ph::Cell, Ph::Particle>>,
    steps: u64,
}

impl<Ph: Physics> Node<Ph> {
    /// Create a node that will join the group behind `rendezvous`.
    pub fn new(config: NodeConfig, physics: Ph, rendezvous: Arc<dyn Rendezvous>) -> Self {
        Self {
            config,
            physics,
            rendezvous,
            state: NodeState::Uninitialized,
            membership: None,
            master: None,
            worker: None,
            steps: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Whether this node was elected leader. `false` before
    /// [`distribute`](Self::distribute).
    pub fn is_leader(&self) -> bool {
        self.membership.as_ref().is_some_and(Membership::is_leader)
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The physics collaborator.
    pub fn physics(&self) -> &Ph {
        &self.physics
    }

    fn require(&self, operation: &'static str, state: NodeState) -> Result<(), NodeError> {
        if self.state == state {
            Ok(())
        } else {
            Err(NodeError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Pass `result` through, aborting the group if it is an error.
    fn abort_on_error<T>(&self, result: Result<T, NodeError>) -> Result<T, NodeError> {
        if let Err(e) = &result {
            log::error!("node {:?} failed, aborting the group: {e}", self.config.name);
            self.rendezvous.abort();
        }
        result
    }

    fn worker_mut(&mut self) -> Result<&mut Worker<Ph::Cell, Ph::Particle>, NodeError> {
        let state = self.state;
        self.worker.as_mut().ok_or(NodeError::InvalidState {
            operation: "worker access",
            state,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Join the group, distribute the problem from the leader, and set
    /// up this node's worker.
    ///
    /// Blocks until every member has joined and this worker has finished
    /// its handshake with every neighbor.
    pub fn distribute(&mut self) -> Result<(), NodeError> {
        self.require("distribute", NodeState::Uninitialized)?;
        let distributed = self.join_and_receive();
        self.abort_on_error(distributed)?;
        self.state = NodeState::Stepping;
        Ok(())
    }

    fn join_and_receive(&mut self) -> Result<(), NodeError> {
        let settings = self.physics.settings();
        self.config.validate(&settings)?;
        self.state = NodeState::Distributing;

        let membership = self.rendezvous.join()?;
        let joined = membership.transport.members();
        if joined != self.config.partitions {
            return Err(NodeError::GroupSizeMismatch {
                configured: self.config.partitions,
                joined,
            });
        }
        log::info!(
            "node joined group {:?} as worker {} of {joined}",
            self.config.name,
            membership.worker
        );

        let transport = Arc::clone(&membership.transport);
        if membership.is_leader() {
            let mut global = self.physics.initial_state();
            self.physics.prepare(&mut global, self.config.boundary);
            let mut master = Master::new(Arc::clone(&transport), settings)?;
            master.distribute(global)?;
            self.master = Some(master);
        }
        self.membership = Some(membership);
        self.worker = Some(Worker::receive(transport, settings, self.config.boundary)?);
        Ok(())
    }

    /// Advance this node's partition by one step.
    pub fn step(&mut self) -> Result<(), NodeError> {
        self.require("step", NodeState::Stepping)?;
        let worker = self.worker.as_mut().ok_or(NodeError::InvalidState {
            operation: "step",
            state: NodeState::Stepping,
        })?;
        let stepped = worker.step(&mut self.physics);
        self.abort_on_error(stepped)?;
        self.steps += 1;
        Ok(())
    }

    /// Send this worker's results and, on the leader, gather everyone's.
    fn collect_round(&mut self) -> Result<Option<GlobalState<Ph::Cell, Ph::Particle>>, NodeError> {
        let collected = self.send_and_gather();
        self.abort_on_error(collected)
    }

    fn send_and_gather(
        &mut self,
    ) -> Result<Option<GlobalState<Ph::Cell, Ph::Particle>>, NodeError> {
        self.worker_mut()?.send_results()?;
        match self.master.as_mut() {
            Some(master) => Ok(Some(master.collect()?)),
            None => Ok(None),
        }
    }

    /// Final collection. The leader returns the reassembled global state;
    /// every other node returns `None`.
    pub fn collect(&mut self) -> Result<Option<GlobalState<Ph::Cell, Ph::Particle>>, NodeError> {
        self.require("collect", NodeState::Stepping)?;
        self.state = NodeState::Collecting;
        self.collect_round()
    }

    /// Step once, then run a full collection round and keep stepping
    /// afterwards.
    pub fn step_and_collect(
        &mut self,
    ) -> Result<Option<GlobalState<Ph::Cell, Ph::Particle>>, NodeError> {
        self.step()?;
        self.collect_round()
    }

    /// Wait out the close grace, then close every channel. The leader
    /// also tears down the group.
    pub fn close(&mut self) -> Result<(), NodeError> {
        if !matches!(self.state, NodeState::Stepping | NodeState::Collecting) {
            return Err(NodeError::InvalidState {
                operation: "close",
                state: self.state,
            });
        }
        thread::sleep(self.config.close_grace);
        if let Some(worker) = self.worker.as_mut() {
            worker.close();
        }
        if let Some(master) = self.master.as_mut() {
            master.close();
        }
        if self.is_leader() {
            self.rendezvous.terminate();
        }
        self.state = NodeState::Closed;
        log::debug!("node closed after {} steps", self.steps);
        Ok(())
    }

    /// The whole lifecycle: distribute, step
    /// [`iterations`](NodeConfig::iterations) times, collect, close.
    pub fn run(&mut self) -> Result<Option<GlobalState<Ph::Cell, Ph::Particle>>, NodeError> {
        self.distribute()?;
        for _ in 0..self.config.iterations {
            self.step()?;
        }
        let collected = self.collect()?;
        self.close()?;
        Ok(collected)
    }
}
