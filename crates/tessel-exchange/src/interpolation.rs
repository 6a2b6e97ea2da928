//! The two interpolation phases of a distributed step.
//!
//! Both overlap communication with computation: local work runs while
//! neighbors' data is in flight, and only the remainder waits.

use tessel_core::{Cell, CellGrid, Particle, RealBox};
use tessel_wire::Wire;

use crate::error::ExchangeError;
use crate::manager::SharedDataManager;

/// Deposit particles onto the grid.
///
/// Starts the particle exchange, deposits the local particles, then the
/// arriving particles (which join the local list), then the neighbors'
/// border particles. Finishes with the particle clean-up. The caller
/// resets the deposited quantity beforehand and has already removed the
/// particles the gates reported as leaving.
pub fn interpolate_to_grid<C, P, F>(
    manager: &mut SharedDataManager<C, P>,
    particles: &mut Vec<P>,
    grid: &mut CellGrid<C>,
    mut deposit: F,
) -> Result<(), ExchangeError>
where
    C: Cell + Wire,
    P: Particle + Wire,
    F: FnMut(&P, &mut CellGrid<C>),
{
    manager.start_exchange_of_particles()?;

    for p in particles.iter() {
        deposit(p, grid);
    }

    let arriving = manager.arriving_particles()?;
    for p in &arriving {
        deposit(p, grid);
    }
    let ghosts = manager.ghost_particles()?;
    for p in &ghosts {
        deposit(p, grid);
    }
    log::trace!(
        "deposited {} local, {} arriving, {} ghost particles",
        particles.len(),
        arriving.len(),
        ghosts.len()
    );
    particles.extend(arriving);

    manager.clean_up_particle()
}

/// Gather grid values onto particles.
///
/// Sends the border cells, gathers for every particle inside `zone`
/// (whose stencil touches no ghost cell), waits for the ghost cells, then
/// gathers for the rest. Finishes with the cell clean-up.
pub fn interpolate_to_particles<C, P, F>(
    manager: &SharedDataManager<C, P>,
    particles: &mut [P],
    grid: &mut CellGrid<C>,
    zone: &RealBox,
    mut gather: F,
) -> Result<(), ExchangeError>
where
    C: Cell + Wire,
    P: Particle + Wire,
    F: FnMut(&mut P, &CellGrid<C>),
{
    manager.exchange_cells(grid)?;

    let mut deferred = Vec::new();
    for (i, p) in particles.iter_mut().enumerate() {
        let (x, y) = p.position();
        if zone.contains(x, y) {
            gather(p, grid);
        } else {
            deferred.push(i);
        }
    }

    manager.wait_for_ghost_cells(grid)?;
    for i in deferred {
        gather(&mut particles[i], grid);
    }

    manager.clean_up_cell();
    Ok(())
}
