//! Seeded fixtures and runners for whole-grid versus distributed runs.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessel_engine::{GlobalState, GridSettings, Node, NodeConfig, NodeError, Physics};
use tessel_exchange::{LocalCluster, Rendezvous};
use tessel_space::BoundaryType;

use crate::{ToyCell, ToyParticle, ToyPhysics};

/// Uniform sample in `[0, 1)` from the top 53 bits of a draw.
fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// `count` particles spread uniformly over the grid, with alternating
/// charge and speeds below `max_speed` on each axis.
pub fn seeded_particles(
    grid: &GridSettings,
    count: usize,
    max_speed: f64,
    seed: u64,
) -> Vec<ToyParticle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (w, h) = (
        grid.nx as f64 * grid.cell_width,
        grid.ny as f64 * grid.cell_height,
    );
    (0..count)
        .map(|i| {
            let x = unit(&mut rng) * w;
            let y = unit(&mut rng) * h;
            ToyParticle {
                id: i as u32,
                x,
                y,
                px: x,
                py: y,
                vx: (2.0 * unit(&mut rng) - 1.0) * max_speed,
                vy: (2.0 * unit(&mut rng) - 1.0) * max_speed,
                q: if i % 2 == 0 { 1.0 } else { -1.0 },
                m: 1.0 + 0.5 * unit(&mut rng),
                ex: 0.0,
                ey: 0.0,
            }
        })
        .collect()
}

// ── Runners ─────────────────────────────────────────────────────

/// The whole-grid reference: the prepared state followed by the state
/// after each of `steps` steps.
pub fn run_monolithic(
    physics: &ToyPhysics,
    boundary: BoundaryType,
    steps: u64,
) -> Vec<GlobalState<ToyCell, ToyParticle>> {
    let mut physics = physics.clone();
    let mut state = physics.initial_state();
    physics.prepare(&mut state, boundary);
    let mut states = vec![state.clone()];
    for _ in 0..steps {
        physics.step_global(&mut state, boundary);
        states.push(state.clone());
    }
    states
}

/// What the leader of a distributed run collected.
#[derive(Debug)]
pub struct DistributedRun {
    /// One state per collection round, in order.
    pub collected: Vec<GlobalState<ToyCell, ToyParticle>>,
}

impl DistributedRun {
    /// The last collected state.
    pub fn last(&self) -> &GlobalState<ToyCell, ToyParticle> {
        self.collected.last().expect("leader collected nothing")
    }
}

/// Run `partitions` nodes on threads over a [`LocalCluster`].
///
/// With `every_step`, each step is followed by a collection round; the
/// run then holds one state per step. Otherwise the nodes run their
/// whole lifecycle and the run holds the single final collection.
pub fn run_distributed(
    physics: &ToyPhysics,
    partitions: usize,
    boundary: BoundaryType,
    steps: u64,
    every_step: bool,
) -> Result<DistributedRun, NodeError> {
    let cluster = LocalCluster::new(partitions);
    let config = NodeConfig {
        partitions,
        boundary,
        iterations: steps,
        close_grace: Duration::from_millis(5),
        ..NodeConfig::default()
    };

    let handles: Vec<_> = (0..partitions)
        .map(|i| {
            let rendezvous: Arc<dyn Rendezvous> = Arc::new(cluster.clone());
            let mut node = Node::new(config.clone(), physics.clone(), rendezvous);
            thread::Builder::new()
                .name(format!("tessel-node-{i}"))
                .spawn(move || -> Result<Vec<GlobalState<ToyCell, ToyParticle>>, NodeError> {
                    if !every_step {
                        return Ok(node.run()?.into_iter().collect());
                    }
                    node.distribute()?;
                    let mut collected = Vec::new();
                    for _ in 0..steps {
                        collected.extend(node.step_and_collect()?);
                    }
                    node.close()?;
                    Ok(collected)
                })
                .expect("spawn node thread")
        })
        .collect();

    let mut collected = Vec::new();
    let mut first_error = None;
    for handle in handles {
        match handle.join().expect("node thread panicked") {
            Ok(states) => collected.extend(states),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(DistributedRun { collected }),
    }
}

// ── Comparison ──────────────────────────────────────────────────

/// Assert that two global states agree to within `tol`: every cell of
/// the grid, margin included, and every particle matched by id.
pub fn assert_states_close(
    got: &GlobalState<ToyCell, ToyParticle>,
    want: &GlobalState<ToyCell, ToyParticle>,
    tol: f64,
) {
    assert_eq!(got.grid.storage_box(), want.grid.storage_box());
    for ((idx, a), (_, b)) in got.grid.iter().zip(want.grid.iter()) {
        for (name, x, y) in [("rho", a.rho, b.rho), ("ex", a.ex, b.ex), ("ey", a.ey, b.ey)] {
            assert!(
                (x - y).abs() <= tol,
                "cell {idx} {name}: got {x}, want {y}"
            );
        }
    }

    assert_eq!(got.particles.len(), want.particles.len(), "particle count");
    let mut got_p = got.particles.clone();
    let mut want_p = want.particles.clone();
    got_p.sort_by_key(|p| p.id);
    want_p.sort_by_key(|p| p.id);
    for (a, b) in got_p.iter().zip(&want_p) {
        assert_eq!(a.id, b.id, "particle ids differ");
        for (name, x, y) in [
            ("x", a.x, b.x),
            ("y", a.y, b.y),
            ("px", a.px, b.px),
            ("py", a.py, b.py),
            ("vx", a.vx, b.vx),
            ("vy", a.vy, b.vy),
            ("ex", a.ex, b.ex),
            ("ey", a.ey, b.ey),
        ] {
            assert!(
                (x - y).abs() <= tol,
                "particle {} {name}: got {x}, want {y}",
                a.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_particles_are_reproducible_and_inside() {
        let grid = ToyPhysics::default().grid;
        let a = seeded_particles(&grid, 50, 1.0, 3);
        let b = seeded_particles(&grid, 50, 1.0, 3);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| (0.0..32.0).contains(&p.x) && (0.0..16.0).contains(&p.y)));
        assert_ne!(a, seeded_particles(&grid, 50, 1.0, 4));
    }

    #[test]
    fn monolithic_run_conserves_particles() {
        let physics = ToyPhysics {
            particles: 60,
            ..ToyPhysics::default()
        };
        for boundary in [BoundaryType::Periodic, BoundaryType::Hardwall] {
            let states = run_monolithic(&physics, boundary, 3);
            assert_eq!(states.len(), 4);
            assert!(states.iter().all(|s| s.particles.len() == 60));
        }
    }
}
