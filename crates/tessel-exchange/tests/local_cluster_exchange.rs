//! Integration test: halo and particle exchange over a local cluster.
//!
//! Four workers on a 16x16 periodic grid each tag their owned cells with
//! global coordinates, then run one cell exchange and one particle
//! exchange. Every ghost cell must hold the tags of its periodic image,
//! and every handed-off particle must arrive in its new owner's frame.

use std::sync::Arc;
use std::thread;

use tessel_core::{CellGrid, WorkerId};
use tessel_exchange::{Disposition, LocalCluster, SharedDataManager};
use tessel_space::{BoundaryType, NeighborMap, Partitioner, SimplePartitioner};
use tessel_test_utils::{ToyCell, ToyParticle};

const N: i32 = 16;
const WORKERS: usize = 4;

struct Outcome {
    worker: WorkerId,
    grid: CellGrid<ToyCell>,
    origin: (i32, i32),
    particles: Vec<ToyParticle>,
    ghosts: Vec<ToyParticle>,
}

fn run_worker(cluster: LocalCluster, boundary: BoundaryType) -> Outcome {
    let me = cluster.join().unwrap();
    let table = SimplePartitioner.partition(N, N, WORKERS).unwrap();
    let map = NeighborMap::new(me.worker, &table, boundary).unwrap();
    let own = map.partition();
    let (nx, ny) = (own.xsize(), own.ysize());

    let mut grid = CellGrid::new(nx, ny, 1.0, 1.0, ToyCell::default()).unwrap();
    for (idx, cell) in grid.iter_mut() {
        if idx.x >= 0 && idx.y >= 0 && idx.x < nx && idx.y < ny {
            cell.ex = (idx.x + own.xmin) as f64;
            cell.ey = (idx.y + own.ymin) as f64;
            cell.rho = 1.0;
        }
    }

    let mut manager: SharedDataManager<ToyCell, ToyParticle> =
        SharedDataManager::connect(map, Arc::clone(&me.transport), nx, ny, (1.0, 1.0)).unwrap();

    // One particle just past the right edge, one well inside.
    let mut particles = vec![
        ToyParticle {
            id: me.worker.0 * 10,
            x: nx as f64 + 0.25,
            y: ny as f64 / 2.0 + 0.5,
            m: 1.0,
            ..ToyParticle::default()
        },
        ToyParticle {
            id: me.worker.0 * 10 + 1,
            x: nx as f64 / 2.0,
            y: ny as f64 / 2.0,
            m: 1.0,
            ..ToyParticle::default()
        },
    ];
    let gates = manager.particle_gates();
    particles.retain_mut(|p| gates.apply(p) == Disposition::Stay);

    manager.start_exchange_of_particles().unwrap();
    let arriving = manager.arriving_particles().unwrap();
    let ghosts = manager.ghost_particles().unwrap();
    particles.extend(arriving);
    manager.clean_up_particle().unwrap();

    manager.exchange_cells(&grid).unwrap();
    manager.wait_for_ghost_cells(&mut grid).unwrap();
    manager.clean_up_cell();
    manager.close();

    Outcome {
        worker: me.worker,
        grid,
        origin: (own.xmin, own.ymin),
        particles,
        ghosts,
    }
}

fn run_cluster(boundary: BoundaryType) -> Vec<Outcome> {
    let cluster = LocalCluster::new(WORKERS);
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let c = cluster.clone();
            thread::spawn(move || run_worker(c, boundary))
        })
        .collect();
    let mut outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    cluster.terminate();
    outcomes.sort_by_key(|o| o.worker);
    outcomes
}

// ── Cell tests ──────────────────────────────────────────────────

#[test]
fn periodic_ghosts_hold_their_images() {
    for o in run_cluster(BoundaryType::Periodic) {
        for (idx, cell) in o.grid.iter() {
            let gx = (idx.x + o.origin.0).rem_euclid(N);
            let gy = (idx.y + o.origin.1).rem_euclid(N);
            assert_eq!(
                (cell.ex, cell.ey, cell.rho),
                (gx as f64, gy as f64, 1.0),
                "worker {} cell {idx}",
                o.worker
            );
        }
    }
}

#[test]
fn hardwall_ghosts_inside_the_grid_hold_their_owner_values() {
    for o in run_cluster(BoundaryType::Hardwall) {
        for (idx, cell) in o.grid.iter() {
            let (gx, gy) = (idx.x + o.origin.0, idx.y + o.origin.1);
            if (0..N).contains(&gx) && (0..N).contains(&gy) {
                assert_eq!((cell.ex, cell.ey), (gx as f64, gy as f64), "cell {idx}");
            } else {
                // Nobody owns it, so the physical boundary value survives.
                assert_eq!(cell.rho, 0.0, "worker {} cell {idx}", o.worker);
            }
        }
    }
}

// ── Particle tests ──────────────────────────────────────────────

#[test]
fn periodic_handoff_lands_in_the_new_frame() {
    let outcomes = run_cluster(BoundaryType::Periodic);
    let total: usize = outcomes.iter().map(|o| o.particles.len()).sum();
    assert_eq!(total, 2 * WORKERS);

    for o in &outcomes {
        let arrived: Vec<_> = o.particles.iter().filter(|p| p.id % 10 == 0).collect();
        assert_eq!(arrived.len(), 1, "worker {}", o.worker);
        let p = arrived[0];
        assert!((p.x - 0.25).abs() < 1e-12, "worker {} got x = {}", o.worker, p.x);
        // The sender sits to the left, periodically.
        let sender = &outcomes[(p.id / 10) as usize];
        let left_edge = (o.origin.0 - 1).rem_euclid(N);
        assert!(left_edge >= sender.origin.0);
        assert_eq!(sender.origin.1, o.origin.1);
    }
}

#[test]
fn arrivals_on_the_border_are_forwarded_as_ghosts() {
    let outcomes = run_cluster(BoundaryType::Periodic);
    // Each arrival sits in its new owner's left border strip, so the
    // left neighbor (its original sender) sees it again as a ghost.
    for o in &outcomes {
        let own_ids: Vec<u32> = vec![o.worker.0 * 10];
        assert!(
            o.ghosts.iter().any(|g| own_ids.contains(&g.id)),
            "worker {} never saw its handed-off particle as a ghost",
            o.worker
        );
    }
}
