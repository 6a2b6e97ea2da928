//! Particle boundary handling for a decomposed domain.
//!
//! [`ParticleGates`] replaces the physical boundary check of a
//! single-process run. Every particle position is classified twice:
//!
//! - against the border regions, where a translated copy is queued as a
//!   border particle for each neighbor interested in that region;
//! - against the boundary regions, where a particle outside the partition
//!   is either handed to the neighbor owning that space (translated into
//!   its frame and queued as leaving) or, when nobody owns it, bounced
//!   off the physical wall.

use std::sync::Arc;

use tessel_core::{CellIndex, Direction, Particle, RealBox, WorkerId};
use tessel_space::{BorderRegion, BoundaryRegion, BoundaryType, NeighborMap};

use crate::shared::Outbox;

/// What the caller must do with a particle after [`ParticleGates::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The particle stays in the local list.
    Stay,
    /// The particle now belongs to a neighbor and must be removed from
    /// the local list. It has already been queued for sending.
    Leaving,
}

struct Route<P> {
    neighbor: WorkerId,
    outbox: Arc<Outbox<P>>,
    shift: (f64, f64),
}

enum BoundaryAction<P> {
    Keep,
    Wall(Direction),
    Handoff(Route<P>),
}

/// The boundary gate table of one worker.
pub struct ParticleGates<P> {
    boundary_type: BoundaryType,
    sim: RealBox,
    inner: RealBox,
    boundary: Vec<BoundaryAction<P>>,
    border: Vec<Vec<Route<P>>>,
}

impl<P: Particle> ParticleGates<P> {
    /// Build the table from `map`. `outbox` returns the outgoing particle
    /// lists of a neighbor; neighbors it does not know are skipped.
    pub(crate) fn new(
        map: &NeighborMap,
        sim: RealBox,
        inner: RealBox,
        cell_size: (f64, f64),
        outbox: impl Fn(WorkerId) -> Option<Arc<Outbox<P>>>,
    ) -> Self {
        let route = |neighbor: WorkerId, off: CellIndex| {
            outbox(neighbor).map(|outbox| Route {
                neighbor,
                outbox,
                shift: (
                    -(off.x as f64) * cell_size.0,
                    -(off.y as f64) * cell_size.1,
                ),
            })
        };

        let boundary = BoundaryRegion::all()
            .map(|region| {
                if region == BoundaryRegion::CENTER {
                    return BoundaryAction::Keep;
                }
                match (map.boundary_neighbor(region), map.boundary_offset(region)) {
                    (Some(nb), Some(off)) => route(nb, off)
                        .map(BoundaryAction::Handoff)
                        .unwrap_or(BoundaryAction::Wall(region.sign())),
                    _ => BoundaryAction::Wall(region.sign()),
                }
            })
            .collect();

        let border = BorderRegion::all()
            .map(|region| {
                map.border_neighbors(region)
                    .iter()
                    .zip(map.border_offsets(region))
                    .filter_map(|pair| match pair {
                        (Some(nb), Some(off)) => route(*nb, *off),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        Self {
            boundary_type: map.boundary_type(),
            sim,
            inner,
            boundary,
            border,
        }
    }

    /// The local simulation area, `[0, W) x [0, H)`.
    pub fn sim_area(&self) -> RealBox {
        self.sim
    }

    /// The simulation area minus the border strips.
    pub fn inner_area(&self) -> RealBox {
        self.inner
    }

    /// Run the border gates, then the boundary gate, on `particle`.
    pub fn apply(&self, particle: &mut P) -> Disposition {
        let (x, y) = particle.position();

        let region = BorderRegion::classify(&self.sim, &self.inner, x, y);
        for route in &self.border[region.code()] {
            let mut copy = particle.clone();
            copy.translate(route.shift.0, route.shift.1);
            route.outbox.push_border(copy);
        }

        match &self.boundary[BoundaryRegion::classify(&self.sim, x, y).code()] {
            BoundaryAction::Keep => Disposition::Stay,
            BoundaryAction::Wall(sign) => {
                self.boundary_type.apply_wall(particle, *sign, &self.sim);
                Disposition::Stay
            }
            BoundaryAction::Handoff(route) => {
                particle.translate(route.shift.0, route.shift.1);
                log::trace!("particle handed off to worker {}", route.neighbor);
                route.outbox.push_leaving(particle.clone());
                Disposition::Leaving
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedData;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use tessel_core::{Cell, IntBox};
    use tessel_space::{PartitionTable, Partitioner, SimplePartitioner};
    use tessel_wire::codec::{read_f64_le, write_f64_le};
    use tessel_wire::{Wire, WireError};

    #[derive(Clone, Debug, PartialEq)]
    struct Dot {
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
    }

    impl Particle for Dot {
        fn position(&self) -> (f64, f64) {
            (self.x, self.y)
        }
        fn translate(&mut self, dx: f64, dy: f64) {
            self.x += dx;
            self.y += dy;
        }
        fn velocity(&self) -> (f64, f64) {
            (self.vx, self.vy)
        }
        fn set_velocity(&mut self, vx: f64, vy: f64) {
            self.vx = vx;
            self.vy = vy;
        }
    }

    impl Wire for Dot {
        fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
            for v in [self.x, self.y, self.vx, self.vy] {
                write_f64_le(w, v)?;
            }
            Ok(())
        }
        fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
            Ok(Dot {
                x: read_f64_le(r)?,
                y: read_f64_le(r)?,
                vx: read_f64_le(r)?,
                vy: read_f64_le(r)?,
            })
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Empty;
    impl Cell for Empty {}
    impl Wire for Empty {
        fn encode(&self, _: &mut dyn Write) -> Result<(), WireError> {
            Ok(())
        }
        fn decode(_: &mut dyn Read) -> Result<Self, WireError> {
            Ok(Empty)
        }
    }

    fn dot(x: f64, y: f64) -> Dot {
        Dot {
            x,
            y,
            vx: -0.5,
            vy: 0.25,
        }
    }

    /// Gates of worker `w` in a 32x32 grid of unit cells split 8 ways,
    /// plus the shared data they feed.
    fn setup(
        w: u32,
        bt: BoundaryType,
    ) -> (ParticleGates<Dot>, HashMap<WorkerId, SharedData<Empty, Dot>>) {
        let table: PartitionTable = SimplePartitioner.partition(32, 32, 8).unwrap();
        let map = NeighborMap::new(WorkerId(w), &table, bt).unwrap();
        let p = map.partition();
        let shared: HashMap<_, _> = map
            .neighbors()
            .into_iter()
            .map(|nb| (nb, SharedData::new(nb, IntBox::new(-1, p.xsize(), -1, p.ysize()))))
            .collect();
        let (w, h) = (p.xsize() as f64, p.ysize() as f64);
        let gates = ParticleGates::new(
            &map,
            RealBox::new(0.0, w, 0.0, h),
            RealBox::new(1.0, w - 1.0, 1.0, h - 1.0),
            (1.0, 1.0),
            |nb| shared.get(&nb).map(SharedData::outbox),
        );
        (gates, shared)
    }

    // Partition 0 is x 0..=15, y 0..=7: a 16x8 local area.

    #[test]
    fn interior_particle_is_untouched() {
        let (gates, shared) = setup(0, BoundaryType::Periodic);
        let mut p = dot(8.0, 4.0);
        assert_eq!(gates.apply(&mut p), Disposition::Stay);
        assert_eq!(p, dot(8.0, 4.0));
        assert!(shared.values().all(|s| s.border_particles().is_empty()));
    }

    #[test]
    fn crossing_right_edge_hands_off_in_neighbor_frame() {
        let (gates, shared) = setup(0, BoundaryType::Hardwall);
        let mut p = dot(16.25, 4.0);
        assert_eq!(gates.apply(&mut p), Disposition::Leaving);
        assert_eq!(p.x, 0.25);
        let leaving = shared[&WorkerId(2)].leaving_particles();
        assert_eq!(leaving, vec![p]);
    }

    #[test]
    fn periodic_wrap_lands_on_far_side_of_neighbor() {
        let (gates, shared) = setup(0, BoundaryType::Periodic);
        let mut p = dot(-0.25, 4.0);
        assert_eq!(gates.apply(&mut p), Disposition::Leaving);
        // Worker 2 (x 16..=31) sees the particle at global x 31.75.
        assert_eq!(p.x, 15.75);
        assert_eq!(shared[&WorkerId(2)].leaving_particles().len(), 1);
    }

    #[test]
    fn hardwall_without_owner_reflects_in_place() {
        let (gates, shared) = setup(0, BoundaryType::Hardwall);
        let mut p = dot(-0.25, 4.0);
        assert_eq!(gates.apply(&mut p), Disposition::Stay);
        assert_eq!((p.x, p.vx), (-0.25, 0.5));
        assert!(shared.values().all(|s| s.leaving_particles().is_empty()));
    }

    #[test]
    fn border_copy_goes_to_every_corner_neighbor() {
        let (gates, shared) = setup(0, BoundaryType::Periodic);
        let mut p = dot(15.5, 7.5);
        assert_eq!(gates.apply(&mut p), Disposition::Stay);
        let mut receivers: Vec<_> = shared
            .iter()
            .filter(|(_, s)| !s.border_particles().is_empty())
            .map(|(id, _)| id.0)
            .collect();
        receivers.sort();
        assert_eq!(receivers, vec![1, 2, 3]);
        // Worker 3 (x 16..=31, y 8..=15) sees it just below-left of its origin.
        assert_eq!(
            shared[&WorkerId(3)].border_particles()[0].position(),
            (-0.5, -0.5)
        );
    }

    #[test]
    fn hardwall_global_edge_strip_sends_nothing_outward() {
        let (gates, shared) = setup(0, BoundaryType::Hardwall);
        let mut p = dot(0.5, 4.0);
        gates.apply(&mut p);
        assert!(shared.values().all(|s| s.border_particles().is_empty()));
    }
}
