//! Integration test: node state machine and configuration errors.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tessel_core::WorkerId;
use tessel_engine::{
    ConfigError, GlobalState, GridSettings, LocalState, Node, NodeConfig, NodeError, NodeState,
    Physics,
};
use tessel_exchange::{ExchangeError, LocalCluster, Rendezvous, SharedDataManager};
use tessel_space::BoundaryType;
use tessel_test_utils::{run_monolithic, ToyCell, ToyParticle, ToyPhysics};

fn solo_node(config: NodeConfig) -> Node<ToyPhysics> {
    let rendezvous: Arc<dyn Rendezvous> = Arc::new(LocalCluster::new(config.partitions.max(1)));
    Node::new(config, ToyPhysics::default(), rendezvous)
}

fn quick() -> NodeConfig {
    NodeConfig {
        close_grace: Duration::from_millis(1),
        ..NodeConfig::default()
    }
}

// ── State machine ───────────────────────────────────────────────

#[test]
fn operations_before_distribute_are_rejected() {
    let mut node = solo_node(quick());
    assert_eq!(node.state(), NodeState::Uninitialized);
    assert!(matches!(
        node.step(),
        Err(NodeError::InvalidState {
            operation: "step",
            state: NodeState::Uninitialized
        })
    ));
    assert!(matches!(
        node.collect(),
        Err(NodeError::InvalidState { operation: "collect", .. })
    ));
    assert!(matches!(
        node.close(),
        Err(NodeError::InvalidState { operation: "close", .. })
    ));
    assert!(!node.is_leader());
}

#[test]
fn single_node_walks_the_whole_lifecycle() {
    let mut node = solo_node(quick());
    node.distribute().unwrap();
    assert_eq!(node.state(), NodeState::Stepping);
    assert!(node.is_leader());

    node.step().unwrap();
    node.step().unwrap();
    assert_eq!(node.steps(), 2);

    let collected = node.collect().unwrap().expect("the leader collects");
    assert_eq!(node.state(), NodeState::Collecting);
    let reference = run_monolithic(&ToyPhysics::default(), BoundaryType::Periodic, 2);
    tessel_test_utils::assert_states_close(&collected, &reference[2], 1e-10);

    assert!(matches!(
        node.step(),
        Err(NodeError::InvalidState {
            state: NodeState::Collecting,
            ..
        })
    ));
    node.close().unwrap();
    assert_eq!(node.state(), NodeState::Closed);
    assert!(matches!(
        node.distribute(),
        Err(NodeError::InvalidState {
            operation: "distribute",
            state: NodeState::Closed
        })
    ));
}

#[test]
fn step_and_collect_keeps_stepping() {
    let mut node = solo_node(quick());
    node.distribute().unwrap();
    assert!(node.step_and_collect().unwrap().is_some());
    assert_eq!(node.state(), NodeState::Stepping);
    assert!(node.step_and_collect().unwrap().is_some());
    assert_eq!(node.steps(), 2);
    node.close().unwrap();
}

#[test]
fn run_with_iterations_returns_final_state() {
    let mut node = solo_node(NodeConfig {
        iterations: 3,
        boundary: BoundaryType::Hardwall,
        ..quick()
    });
    let collected = node.run().unwrap().expect("the leader collects");
    assert_eq!(node.state(), NodeState::Closed);
    let reference = run_monolithic(&ToyPhysics::default(), BoundaryType::Hardwall, 3);
    tessel_test_utils::assert_states_close(&collected, &reference[3], 1e-10);
}

// ── Configuration ───────────────────────────────────────────────

#[test]
fn invalid_config_fails_before_joining() {
    let mut node = solo_node(NodeConfig {
        partitions: 3,
        ..quick()
    });
    assert!(matches!(
        node.distribute(),
        Err(NodeError::Config(ConfigError::PartitionsNotPowerOfTwo {
            configured: 3
        }))
    ));
    assert_eq!(node.state(), NodeState::Uninitialized);
}

#[test]
fn group_of_the_wrong_size_is_rejected() {
    let rendezvous: Arc<dyn Rendezvous> = Arc::new(LocalCluster::new(1));
    let mut node = Node::new(
        NodeConfig {
            partitions: 2,
            ..quick()
        },
        ToyPhysics::default(),
        rendezvous,
    );
    assert!(matches!(
        node.distribute(),
        Err(NodeError::GroupSizeMismatch {
            configured: 2,
            joined: 1
        })
    ));
}

// ── Failure propagation ─────────────────────────────────────────

/// The toy model, except that one worker fails on a chosen step.
#[derive(Clone)]
struct FailingPhysics {
    inner: ToyPhysics,
    worker: WorkerId,
    fail_on: u32,
    taken: u32,
}

impl Physics for FailingPhysics {
    type Cell = ToyCell;
    type Particle = ToyParticle;

    fn settings(&self) -> GridSettings {
        self.inner.settings()
    }

    fn initial_state(&mut self) -> GlobalState<ToyCell, ToyParticle> {
        self.inner.initial_state()
    }

    fn prepare(&mut self, state: &mut GlobalState<ToyCell, ToyParticle>, boundary: BoundaryType) {
        self.inner.prepare(state, boundary)
    }

    fn step(
        &mut self,
        state: &mut LocalState<ToyCell, ToyParticle>,
        exchange: &mut SharedDataManager<ToyCell, ToyParticle>,
    ) -> Result<(), ExchangeError> {
        self.taken += 1;
        if state.worker == self.worker && self.taken == self.fail_on {
            return Err(ExchangeError::HelperPanicked);
        }
        self.inner.step(state, exchange)
    }
}

#[test]
fn one_failing_worker_fails_the_whole_group() {
    let cluster = LocalCluster::new(4);
    let config = NodeConfig {
        partitions: 4,
        iterations: 5,
        ..quick()
    };
    let physics = FailingPhysics {
        inner: ToyPhysics::default(),
        worker: WorkerId(1),
        fail_on: 2,
        taken: 0,
    };

    let (done_tx, done_rx) = mpsc::channel();
    for i in 0..4 {
        let rendezvous: Arc<dyn Rendezvous> = Arc::new(cluster.clone());
        let mut node = Node::new(config.clone(), physics.clone(), rendezvous);
        let done = done_tx.clone();
        thread::Builder::new()
            .name(format!("tessel-node-{i}"))
            .spawn(move || {
                let outcome = node.run().map(|_| ());
                done.send(outcome).unwrap();
            })
            .unwrap();
    }

    let outcomes: Vec<Result<(), NodeError>> = (0..4)
        .map(|_| done_rx.recv_timeout(Duration::from_secs(30)).unwrap())
        .collect();
    assert!(outcomes.iter().all(Result::is_err), "{outcomes:?}");
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(NodeError::Exchange(ExchangeError::HelperPanicked))
    )));
}

#[test]
fn failed_distribution_releases_waiting_members() {
    // One member has a broken configuration; the others are left
    // waiting for a group that can never assemble.
    let cluster = LocalCluster::new(2);
    let (done_tx, done_rx) = mpsc::channel();
    for (i, partitions) in [(0, 2), (1, 3)] {
        let rendezvous: Arc<dyn Rendezvous> = Arc::new(cluster.clone());
        let mut node = Node::new(
            NodeConfig {
                partitions,
                ..quick()
            },
            ToyPhysics::default(),
            rendezvous,
        );
        let done = done_tx.clone();
        thread::Builder::new()
            .name(format!("tessel-node-{i}"))
            .spawn(move || done.send(node.distribute()).unwrap())
            .unwrap();
    }
    for _ in 0..2 {
        let outcome = done_rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert!(outcome.is_err(), "{outcome:?}");
    }
}
