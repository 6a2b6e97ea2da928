//! Per-neighbor exchange state.
//!
//! A [`SharedData`] owns both directions of the channel pair to one
//! neighbor. Outgoing state is the border-cell export list and the two
//! particle lists filled by the particle gates; incoming state is the
//! bound ghost slots and the buffered batches, each published behind a
//! [`Gate`].
//!
//! Incoming batches are written by the transport's delivery thread and
//! read by the worker thread, so everything the delivery thread touches
//! lives in an `Arc`-shared [`Link`].

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tessel_core::{Cell, CellGrid, CellIndex, Gate, IntBox, Particle, WorkerId};
use tessel_wire::{encode_frame, PeerMessage, Wire};

use crate::error::ExchangeError;
use crate::gates::ParticleGates;
use crate::handler::{dispatch, CellBatchHandler, IndexMapHandler, ParticleBatchHandler};
use crate::transport::{PortKind, ReceivePort, SendPort, Transport};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Outbox ──────────────────────────────────────────────────────

/// Particles queued for one neighbor during the push phase.
///
/// Filled by the particle gates, which also run on delivery threads for
/// arriving particles, hence the locks.
#[derive(Debug)]
pub(crate) struct Outbox<P> {
    leaving: Mutex<Vec<P>>,
    border: Mutex<Vec<P>>,
}

impl<P: Clone> Outbox<P> {
    fn new() -> Self {
        Self {
            leaving: Mutex::new(Vec::new()),
            border: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_leaving(&self, p: P) {
        lock(&self.leaving).push(p);
    }

    pub(crate) fn push_border(&self, p: P) {
        lock(&self.border).push(p);
    }

    fn leaving(&self) -> Vec<P> {
        lock(&self.leaving).clone()
    }

    fn border(&self) -> Vec<P> {
        lock(&self.border).clone()
    }

    fn clear(&self) {
        lock(&self.leaving).clear();
        lock(&self.border).clear();
    }
}

// ── Inbox ───────────────────────────────────────────────────────

#[derive(Debug)]
struct Inbox<C, P> {
    ghost_slots: Mutex<Vec<CellIndex>>,
    ghost_cells: Mutex<Vec<C>>,
    arriving: Mutex<Vec<P>>,
    ghosts: Mutex<Vec<P>>,
    failure: Mutex<Option<String>>,
    index_map_ready: Gate,
    cells_ready: Gate,
    arriving_ready: Gate,
    ghosts_ready: Gate,
}

impl<C, P> Inbox<C, P> {
    fn new() -> Self {
        Self {
            ghost_slots: Mutex::new(Vec::new()),
            ghost_cells: Mutex::new(Vec::new()),
            arriving: Mutex::new(Vec::new()),
            ghosts: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            index_map_ready: Gate::new(),
            cells_ready: Gate::new(),
            arriving_ready: Gate::new(),
            ghosts_ready: Gate::new(),
        }
    }
}

// ── Link ────────────────────────────────────────────────────────

/// The part of a [`SharedData`] shared with the delivery thread and the
/// particle exchange helper.
pub(crate) struct Link<C, P> {
    neighbor: WorkerId,
    bounds: IntBox,
    sender: Mutex<Option<Box<dyn SendPort>>>,
    inbox: Inbox<C, P>,
    outbox: Arc<Outbox<P>>,
    gates: OnceLock<Arc<ParticleGates<P>>>,
}

impl<C, P> Link<C, P>
where
    C: Cell + Wire,
    P: Particle + Wire,
{
    fn send(&self, message: &PeerMessage<C, P>) -> Result<(), ExchangeError> {
        let frame = encode_frame(message)?;
        match lock(&self.sender).as_ref() {
            Some(port) => Ok(port.send(frame)?),
            None => Err(ExchangeError::NotConnected {
                neighbor: self.neighbor,
            }),
        }
    }

    /// Record a delivery failure and open every gate so no waiter hangs.
    fn fail(&self, err: &ExchangeError) {
        log::error!("exchange from worker {} failed: {err}", self.neighbor);
        lock(&self.inbox.failure).get_or_insert_with(|| err.to_string());
        self.inbox.index_map_ready.signal();
        self.inbox.cells_ready.signal();
        self.inbox.arriving_ready.signal();
        self.inbox.ghosts_ready.signal();
    }

    fn check(&self) -> Result<(), ExchangeError> {
        match lock(&self.inbox.failure).as_ref() {
            Some(detail) => Err(ExchangeError::Delivery {
                neighbor: self.neighbor,
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }

    fn wait(&self, gate: &Gate) -> Result<(), ExchangeError> {
        self.check()?;
        gate.wait();
        self.check()
    }

    pub(crate) fn send_leaving(&self) -> Result<(), ExchangeError> {
        let particles = self.outbox.leaving();
        log::trace!("{} leaving particles to worker {}", particles.len(), self.neighbor);
        self.send(&PeerMessage::Leaving(particles))
    }

    pub(crate) fn send_border(&self) -> Result<(), ExchangeError> {
        let particles = self.outbox.border();
        log::trace!("{} border particles to worker {}", particles.len(), self.neighbor);
        self.send(&PeerMessage::Border(particles))
    }

    pub(crate) fn wait_for_arriving(&self) -> Result<(), ExchangeError> {
        self.wait(&self.inbox.arriving_ready)
    }
}

impl<C, P> IndexMapHandler for Link<C, P> {
    fn on_index_map(&self, indexes: Vec<CellIndex>) -> Result<(), ExchangeError> {
        if let Some(&index) = indexes
            .iter()
            .find(|i| !self.bounds.contains(i.x, i.y))
        {
            return Err(ExchangeError::IndexOutOfRange {
                neighbor: self.neighbor,
                index,
            });
        }
        log::debug!("worker {} bound {} ghost slots", self.neighbor, indexes.len());
        *lock(&self.inbox.ghost_slots) = indexes;
        self.inbox.index_map_ready.signal();
        Ok(())
    }
}

impl<C, P> CellBatchHandler<C> for Link<C, P> {
    fn on_cells(&self, cells: Vec<C>) -> Result<(), ExchangeError> {
        let expected = lock(&self.inbox.ghost_slots).len();
        if cells.len() != expected {
            return Err(ExchangeError::GhostBatchMismatch {
                neighbor: self.neighbor,
                expected,
                got: cells.len(),
            });
        }
        *lock(&self.inbox.ghost_cells) = cells;
        self.inbox.cells_ready.signal();
        Ok(())
    }
}

impl<C, P: Particle> ParticleBatchHandler<P> for Link<C, P> {
    fn on_arriving(&self, mut particles: Vec<P>) -> Result<(), ExchangeError> {
        if let Some(gates) = self.gates.get() {
            for p in &mut particles {
                gates.apply(p);
            }
        }
        *lock(&self.inbox.arriving) = particles;
        self.inbox.arriving_ready.signal();
        Ok(())
    }

    fn on_ghosts(&self, particles: Vec<P>) -> Result<(), ExchangeError> {
        *lock(&self.inbox.ghosts) = particles;
        self.inbox.ghosts_ready.signal();
        Ok(())
    }
}

// ── SharedData ──────────────────────────────────────────────────

/// Exchange state for the channel pair to one neighbor.
pub struct SharedData<C, P> {
    neighbor: WorkerId,
    link: Arc<Link<C, P>>,
    receiver: Option<Box<dyn ReceivePort>>,
    border_cells: Vec<CellIndex>,
    border_cells_map: Vec<CellIndex>,
}

impl<C, P> SharedData<C, P>
where
    C: Cell + Wire,
    P: Particle + Wire,
{
    /// Create unconnected state for `neighbor`. `bounds` is the local
    /// grid's storage box, against which incoming index maps are checked.
    pub fn new(neighbor: WorkerId, bounds: IntBox) -> Self {
        Self {
            neighbor,
            link: Arc::new(Link {
                neighbor,
                bounds,
                sender: Mutex::new(None),
                inbox: Inbox::new(),
                outbox: Arc::new(Outbox::new()),
                gates: OnceLock::new(),
            }),
            receiver: None,
            border_cells: Vec::new(),
            border_cells_map: Vec::new(),
        }
    }

    /// The neighbor this state talks to.
    pub fn neighbor(&self) -> WorkerId {
        self.neighbor
    }

    pub(crate) fn link(&self) -> Arc<Link<C, P>> {
        Arc::clone(&self.link)
    }

    pub(crate) fn outbox(&self) -> Arc<Outbox<P>> {
        Arc::clone(&self.link.outbox)
    }

    pub(crate) fn install_gates(&self, gates: Arc<ParticleGates<P>>) {
        if self.link.gates.set(gates).is_err() {
            log::warn!("particle gates for worker {} already installed", self.neighbor);
        }
    }

    // ── Setup ───────────────────────────────────────────────────

    /// Export local cell `local` to the neighbor, where it lands at
    /// `remote` in the neighbor's frame.
    pub fn register_border_cell(&mut self, local: CellIndex, remote: CellIndex) {
        self.border_cells.push(local);
        self.border_cells_map.push(remote);
    }

    /// Local cells exported to the neighbor, in export order.
    pub fn border_cells(&self) -> &[CellIndex] {
        &self.border_cells
    }

    /// Where each exported cell lands in the neighbor's frame.
    pub fn border_cells_map(&self) -> &[CellIndex] {
        &self.border_cells_map
    }

    /// Start receiving from the neighbor on `transport`.
    pub fn open(&mut self, transport: &dyn Transport) -> Result<(), ExchangeError> {
        let link = Arc::clone(&self.link);
        let port = PortKind::Exchange {
            from: self.neighbor,
        };
        let receiver = transport.receive(
            port,
            Box::new(move |delivery| {
                let handled = delivery
                    .map_err(ExchangeError::from)
                    .and_then(|frame| dispatch::<C, P, _>(&frame, &*link));
                if let Err(e) = handled {
                    link.fail(&e);
                }
            }),
        )?;
        self.receiver = Some(receiver);
        Ok(())
    }

    /// Connect the sending direction and ship the index map.
    pub fn connect(&mut self, transport: &dyn Transport) -> Result<(), ExchangeError> {
        let port = transport.connect(
            self.neighbor,
            PortKind::Exchange {
                from: transport.worker(),
            },
        )?;
        *lock(&self.link.sender) = Some(port);
        self.link
            .send(&PeerMessage::IndexMap(self.border_cells_map.clone()))
    }

    /// Block until the neighbor's index map has bound the ghost slots.
    pub fn wait_for_index_map(&self) -> Result<(), ExchangeError> {
        self.link.wait(&self.link.inbox.index_map_ready)
    }

    /// Local ghost slots bound by the neighbor's index map.
    pub fn ghost_slots(&self) -> Vec<CellIndex> {
        lock(&self.link.inbox.ghost_slots).clone()
    }

    // ── Cells ───────────────────────────────────────────────────

    /// Send the current values of the exported cells.
    pub fn exchange_cells(&self, grid: &CellGrid<C>) -> Result<(), ExchangeError> {
        let cells = self
            .border_cells
            .iter()
            .map(|&i| grid.cell(i).cloned())
            .collect::<Result<Vec<C>, _>>()?;
        self.link.send(&PeerMessage::Cells(cells))
    }

    /// Block until the neighbor's cell batch is in, then copy it into
    /// the bound ghost slots of `grid`.
    pub fn wait_for_ghost_cells(&self, grid: &mut CellGrid<C>) -> Result<(), ExchangeError> {
        self.link.wait(&self.link.inbox.cells_ready)?;
        let slots = lock(&self.link.inbox.ghost_slots);
        let cells = lock(&self.link.inbox.ghost_cells);
        for (&slot, value) in slots.iter().zip(cells.iter()) {
            grid.cell_mut(slot)?.copy_from(value);
        }
        Ok(())
    }

    /// Rearm the cell gate for the next step.
    pub fn clean_up_cell(&self) {
        self.link.inbox.cells_ready.reset();
    }

    // ── Particles ───────────────────────────────────────────────

    /// Particles queued as leaving towards the neighbor this step.
    pub fn leaving_particles(&self) -> Vec<P> {
        self.link.outbox.leaving()
    }

    /// Border particles queued for the neighbor this step.
    pub fn border_particles(&self) -> Vec<P> {
        self.link.outbox.border()
    }

    /// Block until the neighbor's leaving particles are in and return
    /// them.
    pub fn arriving_particles(&self) -> Result<Vec<P>, ExchangeError> {
        self.link.wait(&self.link.inbox.arriving_ready)?;
        Ok(lock(&self.link.inbox.arriving).clone())
    }

    /// Block until the neighbor's border particles are in and return
    /// them.
    pub fn ghost_particles(&self) -> Result<Vec<P>, ExchangeError> {
        self.link.wait(&self.link.inbox.ghosts_ready)?;
        Ok(lock(&self.link.inbox.ghosts).clone())
    }

    /// Clear the outgoing particle lists and rearm the particle gates.
    pub fn clean_up_particle(&self) {
        self.link.outbox.clear();
        lock(&self.link.inbox.arriving).clear();
        lock(&self.link.inbox.ghosts).clear();
        self.link.inbox.arriving_ready.reset();
        self.link.inbox.ghosts_ready.reset();
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Close the sending direction, then stop the delivery thread.
    pub fn close(&mut self) {
        if let Some(mut sender) = lock(&self.link.sender).take() {
            sender.close();
        }
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
        }
    }
}
