//! The per-node role: own one partition and step it.

use std::sync::Arc;

use crossbeam_channel::bounded;
use tessel_core::{Cell, CellGrid, IntBox, Particle};
use tessel_exchange::{PortKind, SharedDataManager, Transport};
use tessel_space::{BoundaryType, NeighborMap, PartitionTable};
use tessel_wire::{decode_frame, encode_frame, Problem, Results, Wire};

use crate::error::NodeError;
use crate::master::result_area;
use crate::physics::{GridSettings, LocalState, Physics};

/// One worker: its slice of the state and its exchange coordinator.
pub struct Worker<C, P> {
    transport: Arc<dyn Transport>,
    global_box: IntBox,
    state: LocalState<C, P>,
    exchange: SharedDataManager<C, P>,
}

impl<C, P> Worker<C, P>
where
    C: Cell + Wire,
    P: Particle + Wire,
{
    /// Wait for the leader's [`Problem`], then build the local grid and
    /// connect to every neighbor.
    ///
    /// Returns once the index-map handshake with every neighbor is done.
    pub fn receive(
        transport: Arc<dyn Transport>,
        settings: GridSettings,
        boundary: BoundaryType,
    ) -> Result<Self, NodeError> {
        let (tx, rx) = bounded(1);
        let mut port = transport.receive(
            PortKind::Problem,
            Box::new(move |delivery| {
                let problem = delivery
                    .map_err(NodeError::from)
                    .and_then(|frame| {
                        decode_frame::<Problem<C, P>>(&frame).map_err(NodeError::from)
                    });
                if tx.try_send(problem).is_err() {
                    log::warn!("ignored an unexpected second problem frame");
                }
            }),
        )?;
        let problem = rx.recv().map_err(|_| NodeError::ProblemLost);
        port.close();
        let problem = problem??;

        let worker = transport.worker();
        let global_box = settings.global_box();
        let table = PartitionTable::new(global_box, problem.partitions)?;
        let map = NeighborMap::new(worker, &table, boundary)?;
        let partition = map.partition();
        let grid = CellGrid::from_block(
            partition.xsize(),
            partition.ysize(),
            settings.cell_width,
            settings.cell_height,
            problem.cells,
        )?;
        log::debug!(
            "worker {worker} received partition {partition} with {} particles",
            problem.particles.len()
        );

        let exchange = SharedDataManager::connect(
            map,
            Arc::clone(&transport),
            partition.xsize(),
            partition.ysize(),
            settings.cell_size(),
        )?;
        Ok(Self {
            transport,
            global_box,
            state: LocalState {
                worker,
                partition,
                boundary,
                grid,
                particles: problem.particles,
            },
            exchange,
        })
    }

    /// This worker's slice of the simulation.
    pub fn state(&self) -> &LocalState<C, P> {
        &self.state
    }

    /// Advance the slice by one step.
    pub fn step<Ph>(&mut self, physics: &mut Ph) -> Result<(), NodeError>
    where
        Ph: Physics<Cell = C, Particle = P>,
    {
        physics.step(&mut self.state, &mut self.exchange)?;
        Ok(())
    }

    /// Send the current particles and owned cells to the leader.
    ///
    /// The cell block includes the margin on every side that lies on the
    /// global edge, so physical boundary values make it back too.
    pub fn send_results(&self) -> Result<(), NodeError> {
        let partition = self.state.partition;
        let area = result_area(&partition, &self.global_box)
            .translate(-partition.xmin, -partition.ymin);
        let results = Results {
            worker: self.state.worker,
            particles: self.state.particles.clone(),
            cells: self.state.grid.block(&area)?,
        };
        let mut port = self
            .transport
            .connect(self.transport.leader(), PortKind::Results)?;
        port.send(encode_frame(&results)?)?;
        port.close();
        log::trace!(
            "worker {} sent {} particles and {} cells",
            self.state.worker,
            results.particles.len(),
            results.cells.len()
        );
        Ok(())
    }

    /// Close every neighbor channel.
    pub fn close(&mut self) {
        self.exchange.close();
    }
}
