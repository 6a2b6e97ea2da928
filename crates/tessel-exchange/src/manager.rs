//! The per-worker exchange coordinator.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use indexmap::IndexMap;
use tessel_core::{
    Cell, CellGrid, Direction, IntBox, Particle, RealBox, WorkerId, GHOST_MARGIN,
    INTERPOLATION_RADIUS,
};
use tessel_space::{communication_peers, BorderRegion, BoundaryRegion, NeighborMap};
use tessel_wire::Wire;

use crate::cells::border_cell_plan;
use crate::error::{ExchangeError, TransportError};
use crate::gates::ParticleGates;
use crate::shared::{Link, SharedData};
use crate::transport::Transport;

/// Owns every [`SharedData`] of one worker and runs the exchange
/// protocol across all of them.
///
/// Shared data is created on first reference and kept in creation order.
/// [`connect`](Self::connect) creates it eagerly for every communication
/// peer, so both ends of each channel pair always exist.
pub struct SharedDataManager<C, P> {
    map: NeighborMap,
    transport: Arc<dyn Transport>,
    nx: i32,
    ny: i32,
    cell_size: (f64, f64),
    shared: IndexMap<WorkerId, SharedData<C, P>>,
    gates: Option<Arc<ParticleGates<P>>>,
    exchange: Option<JoinHandle<Result<(), ExchangeError>>>,
}

impl<C, P> SharedDataManager<C, P>
where
    C: Cell + Wire,
    P: Particle + Wire,
{
    /// Create a manager for the worker described by `map`, whose local
    /// grid has `nx x ny` owned cells of size `cell_size`.
    pub fn new(
        map: NeighborMap,
        transport: Arc<dyn Transport>,
        nx: i32,
        ny: i32,
        cell_size: (f64, f64),
    ) -> Self {
        Self {
            map,
            transport,
            nx,
            ny,
            cell_size,
            shared: IndexMap::new(),
            gates: None,
            exchange: None,
        }
    }

    /// Full setup: create shared data for every peer, build the particle
    /// gates, register the border cells, and run the index-map handshake.
    pub fn connect(
        map: NeighborMap,
        transport: Arc<dyn Transport>,
        nx: i32,
        ny: i32,
        cell_size: (f64, f64),
    ) -> Result<Self, ExchangeError> {
        let mut manager = Self::new(map, transport, nx, ny, cell_size);
        let peers = communication_peers(
            manager.map.worker(),
            manager.map.table(),
            manager.map.boundary_type(),
        )?;
        for peer in peers {
            manager.get_or_create(peer);
        }
        manager.particle_gates();
        manager.register_border_cells();
        manager.initialize_communication()?;
        Ok(manager)
    }

    // ── Lookup ──────────────────────────────────────────────────

    /// The neighbor map this manager was built from.
    pub fn neighbor_map(&self) -> &NeighborMap {
        &self.map
    }

    /// The local grid's storage box.
    fn bounds(&self) -> IntBox {
        IntBox::new(0, self.nx - 1, 0, self.ny - 1).grow(GHOST_MARGIN)
    }

    /// Shared data for `worker`, created if absent.
    pub fn get_or_create(&mut self, worker: WorkerId) -> &mut SharedData<C, P> {
        let bounds = self.bounds();
        self.shared.entry(worker).or_insert_with(|| {
            log::debug!("created shared data for worker {worker}");
            SharedData::new(worker, bounds)
        })
    }

    /// Shared data for `worker`, if it exists.
    pub fn shared_data(&self, worker: WorkerId) -> Option<&SharedData<C, P>> {
        self.shared.get(&worker)
    }

    /// Every shared data, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedData<C, P>> {
        self.shared.values()
    }

    /// Shared data of the neighbor owning boundary `region`, if any.
    pub fn boundary_shared_data(&mut self, region: BoundaryRegion) -> Option<&SharedData<C, P>> {
        let nb = self.map.boundary_neighbor(region)?;
        Some(&*self.get_or_create(nb))
    }

    /// Direction towards the neighbor owning boundary `region`.
    pub fn boundary_direction(&self, region: BoundaryRegion) -> Option<Direction> {
        self.map.boundary_direction(region)
    }

    /// Shared data of each valid neighbor of border `region`, in slot
    /// order. Empty slots are skipped.
    pub fn border_shared_data(&mut self, region: BorderRegion) -> Vec<&SharedData<C, P>> {
        let ids: Vec<WorkerId> = self
            .map
            .border_neighbors(region)
            .iter()
            .flatten()
            .copied()
            .collect();
        for &id in &ids {
            self.get_or_create(id);
        }
        ids.iter().filter_map(|id| self.shared.get(id)).collect()
    }

    /// Directions matching [`border_shared_data`](Self::border_shared_data).
    pub fn border_directions(&self, region: BorderRegion) -> Vec<Direction> {
        self.map
            .border_neighbors(region)
            .iter()
            .zip(self.map.border_directions(region))
            .filter_map(|pair| match pair {
                (Some(_), Some(dir)) => Some(*dir),
                _ => None,
            })
            .collect()
    }

    // ── Setup ───────────────────────────────────────────────────

    /// The local simulation area, `[0, W) x [0, H)`.
    pub fn sim_area(&self) -> RealBox {
        RealBox::new(
            0.0,
            self.nx as f64 * self.cell_size.0,
            0.0,
            self.ny as f64 * self.cell_size.1,
        )
    }

    /// The simulation area minus a border strip of
    /// [`INTERPOLATION_RADIUS`] cells on every side.
    pub fn inner_area(&self) -> RealBox {
        let (cw, ch) = self.cell_size;
        let r = INTERPOLATION_RADIUS as f64;
        let sim = self.sim_area();
        RealBox::new(
            r * cw,
            sim.xmax - r * cw,
            r * ch,
            sim.ymax - r * ch,
        )
    }

    /// The particle gates, built on first use over the shared data that
    /// exists at that point.
    pub fn particle_gates(&mut self) -> Arc<ParticleGates<P>> {
        if let Some(gates) = &self.gates {
            return Arc::clone(gates);
        }
        for nb in self.map.neighbors() {
            self.get_or_create(nb);
        }
        let gates = Arc::new(ParticleGates::new(
            &self.map,
            self.sim_area(),
            self.inner_area(),
            self.cell_size,
            |nb| self.shared.get(&nb).map(SharedData::outbox),
        ));
        for sd in self.shared.values() {
            sd.install_gates(Arc::clone(&gates));
        }
        self.gates = Some(Arc::clone(&gates));
        gates
    }

    /// Register every local cell within interpolation range of a
    /// neighbor with that neighbor's shared data.
    pub fn register_border_cells(&mut self) {
        let plan = border_cell_plan(&self.map, self.nx, self.ny, self.cell_size);
        let registered = plan.len();
        for cell in plan {
            self.get_or_create(cell.neighbor)
                .register_border_cell(cell.local, cell.remote);
        }
        log::debug!(
            "worker {} registered {registered} border cells for {} neighbors",
            self.map.worker(),
            self.shared.len()
        );
    }

    /// Open every channel pair, send each index map, and wait until every
    /// neighbor's index map has bound the local ghost slots.
    pub fn initialize_communication(&mut self) -> Result<(), ExchangeError> {
        let transport = Arc::clone(&self.transport);
        for sd in self.shared.values_mut() {
            sd.open(transport.as_ref())?;
        }
        for sd in self.shared.values_mut() {
            sd.connect(transport.as_ref())?;
        }
        for sd in self.shared.values() {
            sd.wait_for_index_map()?;
        }
        log::info!(
            "worker {} connected to {} neighbors",
            self.map.worker(),
            self.shared.len()
        );
        Ok(())
    }

    // ── Particles ───────────────────────────────────────────────

    /// Start the particle exchange on a helper thread: send leaving
    /// particles to all neighbors, wait for every neighbor's arriving
    /// particles, then send border particles to all neighbors.
    ///
    /// Border particles go out last because arriving particles can
    /// themselves produce border copies.
    pub fn start_exchange_of_particles(&mut self) -> Result<(), ExchangeError> {
        let links: Vec<Arc<Link<C, P>>> = self.shared.values().map(SharedData::link).collect();
        let handle = thread::Builder::new()
            .name(format!("tessel-exchange-{}", self.map.worker()))
            .spawn(move || {
                for link in &links {
                    link.send_leaving()?;
                }
                for link in &links {
                    link.wait_for_arriving()?;
                }
                for link in &links {
                    link.send_border()?;
                }
                Ok(())
            })
            .map_err(|e| TransportError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;
        self.exchange = Some(handle);
        Ok(())
    }

    /// Particles queued as leaving this step, across all neighbors.
    pub fn leaving_particles(&self) -> Vec<P> {
        self.shared
            .values()
            .flat_map(|sd| sd.leaving_particles())
            .collect()
    }

    /// Every neighbor's arriving particles. Blocks until all are in.
    pub fn arriving_particles(&self) -> Result<Vec<P>, ExchangeError> {
        let mut out = Vec::new();
        for sd in self.shared.values() {
            out.extend(sd.arriving_particles()?);
        }
        Ok(out)
    }

    /// Every neighbor's border particles. Blocks until all are in.
    pub fn ghost_particles(&self) -> Result<Vec<P>, ExchangeError> {
        let mut out = Vec::new();
        for sd in self.shared.values() {
            out.extend(sd.ghost_particles()?);
        }
        Ok(out)
    }

    /// Join the helper thread, then clear and rearm every neighbor's
    /// particle state.
    pub fn clean_up_particle(&mut self) -> Result<(), ExchangeError> {
        let result = match self.exchange.take() {
            Some(handle) => handle.join().unwrap_or(Err(ExchangeError::HelperPanicked)),
            None => Ok(()),
        };
        for sd in self.shared.values() {
            sd.clean_up_particle();
        }
        result
    }

    // ── Cells ───────────────────────────────────────────────────

    /// Send the exported border cells of `grid` to every neighbor.
    pub fn exchange_cells(&self, grid: &CellGrid<C>) -> Result<(), ExchangeError> {
        for sd in self.shared.values() {
            sd.exchange_cells(grid)?;
        }
        Ok(())
    }

    /// Block until every neighbor's cell batch is in and copy them all
    /// into the ghost slots of `grid`.
    pub fn wait_for_ghost_cells(&self, grid: &mut CellGrid<C>) -> Result<(), ExchangeError> {
        for sd in self.shared.values() {
            sd.wait_for_ghost_cells(grid)?;
        }
        Ok(())
    }

    /// Rearm every neighbor's cell gate.
    pub fn clean_up_cell(&self) {
        for sd in self.shared.values() {
            sd.clean_up_cell();
        }
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Join any running helper and close every channel pair.
    pub fn close(&mut self) {
        if let Some(handle) = self.exchange.take() {
            if !matches!(handle.join(), Ok(Ok(()))) {
                log::warn!("particle exchange did not finish cleanly before close");
            }
        }
        for sd in self.shared.values_mut() {
            sd.close();
        }
        log::debug!("worker {} closed its exchange channels", self.map.worker());
    }
}
