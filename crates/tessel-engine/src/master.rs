//! The leader-only role: split the problem, then stitch the results.
//!
//! The [`Master`] partitions the prepared global state, sends every
//! worker its [`Problem`], and listens on the results port for the
//! whole run. Collection is gated on a [`CountingBarrier`] raised once
//! per accepted reply.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tessel_core::{Cell, CellGrid, CountingBarrier, IntBox, Particle, WorkerId, GHOST_MARGIN};
use tessel_exchange::{PortKind, ReceivePort, Transport};
use tessel_space::{PartitionTable, Partitioner, SimplePartitioner};
use tessel_wire::{decode_frame, encode_frame, Problem, Results, Wire};

use crate::error::NodeError;
use crate::physics::{GlobalState, GridSettings};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The block a worker returns: its partition, grown by the ghost margin
/// on every side that lies on the global edge.
pub(crate) fn result_area(partition: &IntBox, global: &IntBox) -> IntBox {
    let grow = |on_edge: bool| if on_edge { GHOST_MARGIN } else { 0 };
    IntBox::new(
        partition.xmin - grow(partition.xmin == global.xmin),
        partition.xmax + grow(partition.xmax == global.xmax),
        partition.ymin - grow(partition.ymin == global.ymin),
        partition.ymax + grow(partition.ymax == global.ymax),
    )
}

// ── Collection ──────────────────────────────────────────────────

/// Replies received on the results port.
///
/// `round` holds at most one reply per worker and feeds the barrier. A
/// worker that replies again before the round is collected is queued in
/// `early` and promoted when the round is taken.
struct Collected<C, P> {
    round: IndexMap<WorkerId, Results<C, P>>,
    early: VecDeque<Results<C, P>>,
    failure: Option<(Option<WorkerId>, String)>,
}

struct Collector<C, P> {
    members: usize,
    state: Mutex<Collected<C, P>>,
    barrier: CountingBarrier,
}

impl<C, P> Collector<C, P> {
    fn new(members: usize) -> Self {
        Self {
            members,
            state: Mutex::new(Collected {
                round: IndexMap::new(),
                early: VecDeque::new(),
                failure: None,
            }),
            barrier: CountingBarrier::new(members),
        }
    }

    fn accept(&self, results: Results<C, P>) {
        let mut state = lock(&self.state);
        if results.worker.index() >= self.members {
            let detail = format!("sender outside a group of {}", self.members);
            self.fail(&mut state, Some(results.worker), detail);
            return;
        }
        if state.round.contains_key(&results.worker) {
            log::debug!("worker {} replied ahead of collection", results.worker);
            state.early.push_back(results);
            return;
        }
        state.round.insert(results.worker, results);
        self.barrier.increment();
    }

    fn fail(&self, state: &mut Collected<C, P>, worker: Option<WorkerId>, detail: String) {
        log::error!("rejected results: {detail}");
        state.failure.get_or_insert((worker, detail));
        // Open the barrier so collection observes the failure.
        while self.barrier.count() < self.barrier.target() {
            self.barrier.increment();
        }
    }

    /// Wait for a full round and take it, promoting early replies into
    /// the next one.
    fn take_round(&self) -> Result<IndexMap<WorkerId, Results<C, P>>, NodeError> {
        self.barrier.wait();
        let mut state = lock(&self.state);
        if let Some((worker, detail)) = state.failure.take() {
            return Err(NodeError::BadResults { worker, detail });
        }
        let round = std::mem::take(&mut state.round);
        self.barrier.reset();

        let mut still_early = VecDeque::new();
        while let Some(results) = state.early.pop_front() {
            if state.round.contains_key(&results.worker) {
                still_early.push_back(results);
            } else {
                state.round.insert(results.worker, results);
                self.barrier.increment();
            }
        }
        state.early = still_early;
        Ok(round)
    }
}

// ── Master ──────────────────────────────────────────────────────

/// The leader's distribution and collection logic.
pub struct Master<C, P> {
    transport: Arc<dyn Transport>,
    settings: GridSettings,
    table: PartitionTable,
    canvas: Option<CellGrid<C>>,
    collector: Arc<Collector<C, P>>,
    results_port: Option<Box<dyn ReceivePort>>,
}

impl<C, P> Master<C, P>
where
    C: Cell + Wire,
    P: Particle + Wire,
{
    /// Partition the grid among every member of the transport's group.
    pub fn new(transport: Arc<dyn Transport>, settings: GridSettings) -> Result<Self, NodeError> {
        let members = transport.members();
        let table = SimplePartitioner.partition(settings.nx, settings.ny, members)?;
        log::debug!("partitioned {}x{} grid into {members}", settings.nx, settings.ny);
        Ok(Self {
            transport,
            settings,
            table,
            canvas: None,
            collector: Arc::new(Collector::new(members)),
            results_port: None,
        })
    }

    /// The partition table in use.
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// The worker owning a particle at global position `(x, y)`.
    ///
    /// The particle's cell is clamped into the global box first, so a
    /// particle sitting exactly on the upper edge still has an owner.
    fn owner_of(&self, x: f64, y: f64) -> Option<WorkerId> {
        let cx = ((x / self.settings.cell_width).floor() as i32).clamp(0, self.settings.nx - 1);
        let cy = ((y / self.settings.cell_height).floor() as i32).clamp(0, self.settings.ny - 1);
        self.table.owner_of(cx, cy)
    }

    /// Start listening for results, then send every worker its slice of
    /// `state`. The global grid is kept as the canvas results are pasted
    /// onto, so cells no worker returns keep their prepared values.
    pub fn distribute(&mut self, state: GlobalState<C, P>) -> Result<(), NodeError> {
        let collector = Arc::clone(&self.collector);
        self.results_port = Some(self.transport.receive(
            PortKind::Results,
            Box::new(move |delivery| {
                let results = delivery.map_err(|e| e.to_string()).and_then(|frame| {
                    decode_frame::<Results<C, P>>(&frame).map_err(|e| e.to_string())
                });
                match results {
                    Ok(results) => collector.accept(results),
                    Err(detail) => {
                        let mut state = lock(&collector.state);
                        collector.fail(&mut state, None, detail);
                    }
                }
            }),
        )?);

        let (cw, ch) = self.settings.cell_size();
        let mut buckets: Vec<Vec<P>> = vec![Vec::new(); self.table.len()];
        for p in state.particles {
            let (x, y) = p.position();
            match self.owner_of(x, y) {
                Some(owner) => buckets[owner.index()].push(p),
                None => log::warn!("dropped particle at ({x}, {y}) with no owner"),
            }
        }

        for ((worker, partition), mut particles) in self.table.iter().zip(buckets) {
            let (dx, dy) = (partition.xmin as f64 * cw, partition.ymin as f64 * ch);
            for p in &mut particles {
                p.translate(-dx, -dy);
            }
            let problem = Problem {
                partitions: self.table.boxes().to_vec(),
                cells: state.grid.block(&partition.grow(GHOST_MARGIN))?,
                particles,
            };
            let mut port = self.transport.connect(worker, PortKind::Problem)?;
            port.send(encode_frame(&problem)?)?;
            port.close();
            log::debug!(
                "sent worker {worker} partition {partition} with {} particles",
                problem.particles.len()
            );
        }
        self.canvas = Some(state.grid);
        Ok(())
    }

    /// Block until every worker has replied, then assemble the global
    /// state: cell blocks are pasted at their partitions, particles are
    /// shifted back to the global frame and concatenated in worker order.
    pub fn collect(&mut self) -> Result<GlobalState<C, P>, NodeError> {
        let mut round = self.collector.take_round()?;
        let canvas = self.canvas.as_mut().ok_or(NodeError::NotDistributed)?;
        let global = self.table.global();
        let (cw, ch) = self.settings.cell_size();

        let mut particles = Vec::new();
        for (worker, partition) in self.table.iter() {
            let results = round
                .swap_remove(&worker)
                .ok_or(NodeError::MissingResults { worker })?;
            canvas.paste(&result_area(partition, &global), results.cells)?;
            let (dx, dy) = (partition.xmin as f64 * cw, partition.ymin as f64 * ch);
            particles.extend(results.particles.into_iter().map(|mut p| {
                p.translate(dx, dy);
                p
            }));
        }
        log::info!("collected {} particles from {} workers", particles.len(), self.table.len());
        Ok(GlobalState {
            grid: canvas.clone(),
            particles,
        })
    }

    /// Stop listening for results.
    pub fn close(&mut self) {
        if let Some(mut port) = self.results_port.take() {
            port.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_area_grows_only_on_global_edges() {
        let global = IntBox::new(0, 15, 0, 15);
        assert_eq!(
            result_area(&IntBox::new(0, 7, 0, 7), &global),
            IntBox::new(-1, 7, -1, 7)
        );
        assert_eq!(
            result_area(&IntBox::new(8, 15, 0, 15), &global),
            IntBox::new(8, 16, -1, 16)
        );
        assert_eq!(
            result_area(&IntBox::new(0, 15, 0, 15), &global),
            global.grow(1)
        );
    }

    fn reply(worker: u32, tag: i32) -> Results<i32, i32> {
        Results {
            worker: WorkerId(worker),
            particles: Vec::new(),
            cells: vec![tag],
        }
    }

    #[test]
    fn collector_defers_early_replies_to_next_round() {
        let c = Collector::new(2);
        c.accept(reply(0, 1));
        c.accept(reply(0, 2));
        c.accept(reply(1, 1));

        let first = c.take_round().unwrap();
        assert_eq!(first[&WorkerId(0)].cells, vec![1]);
        assert_eq!(c.barrier.count(), 1);

        c.accept(reply(1, 2));
        let second = c.take_round().unwrap();
        assert_eq!(second[&WorkerId(0)].cells, vec![2]);
        assert_eq!(second[&WorkerId(1)].cells, vec![2]);
    }

    #[test]
    fn collector_failure_opens_barrier() {
        let c: Collector<i32, i32> = Collector::new(3);
        c.accept(reply(7, 0));
        assert!(matches!(
            c.take_round(),
            Err(NodeError::BadResults {
                worker: Some(WorkerId(7)),
                ..
            })
        ));
    }
}
