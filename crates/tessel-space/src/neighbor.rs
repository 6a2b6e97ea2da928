//! Per-worker neighbor topology.
//!
//! A [`NeighborMap`] is built once per worker from the partition table
//! and is read-only afterwards. For every non-center region it records
//! which worker owns the space there, in which direction that worker
//! lies, and where the worker's frame sits relative to the local one.
//! Lookups are done with *probe points*: synthetic cell coordinates one
//! cell outside the partition.
//!
//! - Edge regions probe the midpoint of the edge, shifted outward.
//! - Corner regions probe the corner, shifted outward diagonally. Border
//!   corners also probe the two axis-aligned neighbors of the corner.
//! - Under [`BoundaryType::Periodic`] probes are wrapped into the global
//!   box first, and every probe must resolve.
//! - Under [`BoundaryType::Hardwall`] probes may fall outside the grid.
//!   A boundary corner that resolves to nothing is searched again around
//!   the probe point, which finds the edge-sharing neighbor that takes
//!   over when the true diagonal neighbor does not exist.

use smallvec::{smallvec, SmallVec};
use tessel_core::{CellIndex, Direction, IntBox, WorkerId};

use crate::edge::BoundaryType;
use crate::error::TopologyError;
use crate::partition::PartitionTable;
use crate::region::{Band, BorderRegion, BoundaryRegion};

/// Neighbors of one border region, at most 3. `None` marks a probe that
/// found no neighbor.
pub type NeighborList = SmallVec<[Option<WorkerId>; 3]>;

/// Directions matching a [`NeighborList`] entry for entry.
pub type DirectionList = SmallVec<[Option<Direction>; 3]>;

/// Frame offsets matching a [`NeighborList`] entry for entry.
pub type OffsetList = SmallVec<[Option<CellIndex>; 3]>;

/// A resolved probe: the owner and the origin of its frame in the local
/// frame.
type Found = Option<(WorkerId, CellIndex)>;

/// Resolved neighbors of one worker under one boundary type.
#[derive(Clone, Debug)]
pub struct NeighborMap {
    worker: WorkerId,
    boundary_type: BoundaryType,
    table: PartitionTable,
    partition: IntBox,
    boundary_neighbors: [Option<WorkerId>; BoundaryRegion::COUNT],
    boundary_directions: [Option<Direction>; BoundaryRegion::COUNT],
    boundary_offsets: [Option<CellIndex>; BoundaryRegion::COUNT],
    border_neighbors: [NeighborList; BorderRegion::COUNT],
    border_directions: [DirectionList; BorderRegion::COUNT],
    border_offsets: [OffsetList; BorderRegion::COUNT],
}

impl NeighborMap {
    /// Resolve every region of `worker`'s partition.
    ///
    /// Fails if `worker` is not in the table, if a periodic probe has no
    /// owner (which means the table does not tile the global box), or if
    /// an outside corner claims a cell its diagonal neighbor already
    /// receives.
    pub fn new(
        worker: WorkerId,
        table: &PartitionTable,
        boundary_type: BoundaryType,
    ) -> Result<Self, TopologyError> {
        let partition = *table.get(worker).ok_or(TopologyError::UnknownWorker {
            worker,
            partitions: table.len(),
        })?;
        let mut map = Self {
            worker,
            boundary_type,
            table: table.clone(),
            partition,
            boundary_neighbors: [None; BoundaryRegion::COUNT],
            boundary_directions: [None; BoundaryRegion::COUNT],
            boundary_offsets: [None; BoundaryRegion::COUNT],
            border_neighbors: std::array::from_fn(|_| NeighborList::new()),
            border_directions: std::array::from_fn(|_| DirectionList::new()),
            border_offsets: std::array::from_fn(|_| OffsetList::new()),
        };
        map.resolve_boundary_regions()?;
        map.resolve_border_edges()?;
        map.resolve_border_corners()?;
        map.check_outside_corners()?;
        Ok(map)
    }

    // ── Accessors ───────────────────────────────────────────────

    /// The worker this map belongs to.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// The boundary type the map was resolved under.
    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    /// The worker's own partition, in global cell coordinates.
    pub fn partition(&self) -> IntBox {
        self.partition
    }

    /// The partition table the map was resolved against.
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// The neighbor owning `region`, if any. Always `None` for the center.
    pub fn boundary_neighbor(&self, region: BoundaryRegion) -> Option<WorkerId> {
        self.boundary_neighbors[region.code()]
    }

    /// Direction towards [`boundary_neighbor`](Self::boundary_neighbor).
    pub fn boundary_direction(&self, region: BoundaryRegion) -> Option<Direction> {
        self.boundary_directions[region.code()]
    }

    /// Origin of [`boundary_neighbor`](Self::boundary_neighbor)'s frame
    /// in the local frame. A local cell `c` lands at `c - offset` there.
    pub fn boundary_offset(&self, region: BoundaryRegion) -> Option<CellIndex> {
        self.boundary_offsets[region.code()]
    }

    /// Neighbors that need a copy of data in `region`. Unused regions
    /// return an empty slice; resolved regions may contain `None` slots.
    pub fn border_neighbors(&self, region: BorderRegion) -> &[Option<WorkerId>] {
        &self.border_neighbors[region.code()]
    }

    /// Directions matching [`border_neighbors`](Self::border_neighbors).
    pub fn border_directions(&self, region: BorderRegion) -> &[Option<Direction>] {
        &self.border_directions[region.code()]
    }

    /// Frame offsets matching [`border_neighbors`](Self::border_neighbors).
    pub fn border_offsets(&self, region: BorderRegion) -> &[Option<CellIndex>] {
        &self.border_offsets[region.code()]
    }

    /// Every distinct worker referenced by any region, in ascending order.
    pub fn neighbors(&self) -> Vec<WorkerId> {
        let mut out: Vec<WorkerId> = self
            .boundary_neighbors
            .iter()
            .chain(self.border_neighbors.iter().flatten())
            .flatten()
            .copied()
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    // ── Resolution ──────────────────────────────────────────────

    /// The owner of global cell `(x, y)`, with its origin in the local
    /// frame.
    fn locate(&self, x: i32, y: i32) -> Found {
        let (worker, nb) = self.table.iter().find(|(_, b)| b.contains(x, y))?;
        Some((
            worker,
            CellIndex::new(nb.xmin - self.partition.xmin, nb.ymin - self.partition.ymin),
        ))
    }

    /// Wrap a probe into the global box and locate its owner. The owner's
    /// origin is moved back by the wrap, so it sits next to this
    /// partition on the side the probe was taken.
    fn locate_periodic(&self, x: i32, y: i32) -> Result<(WorkerId, CellIndex), TopologyError> {
        let g = self.table.global();
        let wx = wrap_axis(x, g.xmin, g.xmax);
        let wy = wrap_axis(y, g.ymin, g.ymax);
        let (worker, origin) = self.locate(wx, wy).ok_or(TopologyError::UnresolvedProbe {
            worker: self.worker,
            x: wx,
            y: wy,
        })?;
        Ok((worker, CellIndex::new(origin.x + x - wx, origin.y + y - wy)))
    }

    /// Try the four axis-neighbors of a probe point in turn.
    fn locate_around(&self, x: i32, y: i32) -> Found {
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .into_iter()
            .find_map(|(px, py)| self.locate(px, py))
    }

    fn derived_direction(&self, found: Found) -> Option<Direction> {
        let nb = self.table.get(found?.0)?;
        Some(derive_direction(&self.partition, nb))
    }

    fn resolve_boundary_regions(&mut self) -> Result<(), TopologyError> {
        for region in BoundaryRegion::all() {
            if region == BoundaryRegion::CENTER {
                continue;
            }
            let (x, y) = probe(&self.partition, region.sign());
            let (found, direction) = match self.boundary_type {
                BoundaryType::Periodic => {
                    (Some(self.locate_periodic(x, y)?), Some(region.sign()))
                }
                BoundaryType::Hardwall => {
                    let is_corner = region.sign().dx != 0 && region.sign().dy != 0;
                    let found = match self.locate(x, y) {
                        None if is_corner => self.locate_around(x, y),
                        found => found,
                    };
                    (found, self.derived_direction(found))
                }
            };
            self.boundary_neighbors[region.code()] = found.map(|(w, _)| w);
            self.boundary_offsets[region.code()] = found.map(|(_, o)| o);
            self.boundary_directions[region.code()] = direction;
        }
        Ok(())
    }

    fn resolve_border_edges(&mut self) -> Result<(), TopologyError> {
        for region in BorderRegion::EDGES {
            let sign = region.sign();
            let (x, y) = probe(&self.partition, sign);
            let (found, direction) = match self.boundary_type {
                BoundaryType::Periodic => (Some(self.locate_periodic(x, y)?), Some(sign)),
                BoundaryType::Hardwall => {
                    let found = self.locate(x, y);
                    (found, self.derived_direction(found))
                }
            };
            self.set_border(region, &[found], smallvec![direction]);
        }
        Ok(())
    }

    /// Resolve the 4 border corners and the 8 outside corners derived
    /// from them.
    ///
    /// Each corner probes three points: the true diagonal, then the point
    /// beyond the corner along y, then along x. The two secondary points
    /// coincide with the probes of the outside-corner regions
    /// `(boundary x, border y)` and `(border x, boundary y)`. An outside
    /// corner only receives the secondary neighbor when the diagonal
    /// neighbor is absent; otherwise the diagonal neighbor already gets
    /// the data through the corner region and the slot stays empty.
    fn resolve_border_corners(&mut self) -> Result<(), TopologyError> {
        for region in BorderRegion::CORNERS {
            let s = region.sign();
            let (cx, cy) = corner(&self.partition, s);
            let points = [(cx + s.dx, cy + s.dy), (cx, cy + s.dy), (cx + s.dx, cy)];
            let outside = outside_corners(s);

            match self.boundary_type {
                BoundaryType::Periodic => {
                    let directions = [s, Direction::new(0, s.dy), Direction::new(s.dx, 0)];
                    let mut found = Vec::with_capacity(points.len());
                    for (x, y) in points {
                        found.push(Some(self.locate_periodic(x, y)?));
                    }
                    self.set_border(region, &found, directions.into_iter().map(Some).collect());
                    for o in outside {
                        self.set_border(o, &[None], smallvec![None]);
                    }
                }
                BoundaryType::Hardwall => {
                    let found: Vec<Found> = points.iter().map(|&(x, y)| self.locate(x, y)).collect();
                    let directions: DirectionList =
                        found.iter().map(|&f| self.derived_direction(f)).collect();

                    for o in outside {
                        self.set_border(o, &[None], smallvec![None]);
                    }
                    if found[0].is_none() {
                        for (o, &secondary) in outside.iter().zip(&found[1..]) {
                            if secondary.is_some() {
                                let dir = self.derived_direction(secondary);
                                self.set_border(*o, &[secondary], smallvec![dir]);
                            }
                        }
                    }
                    self.set_border(region, &found, directions);
                }
            }
        }
        Ok(())
    }

    /// An outside corner may only carry data while the diagonal neighbor
    /// of the same corner is absent; otherwise the corner cells would
    /// reach the same ghost slots through two regions.
    fn check_outside_corners(&self) -> Result<(), TopologyError> {
        for region in BorderRegion::CORNERS {
            let diagonal = self.border_neighbors(region).first().copied().flatten();
            if diagonal.is_none() {
                continue;
            }
            for o in outside_corners(region.sign()) {
                if self.border_neighbors(o).iter().any(Option::is_some) {
                    return Err(TopologyError::PrecedenceConflict {
                        worker: self.worker,
                        region: o,
                    });
                }
            }
        }
        Ok(())
    }

    fn set_border(&mut self, region: BorderRegion, found: &[Found], directions: DirectionList) {
        self.border_neighbors[region.code()] = found.iter().map(|f| f.map(|(w, _)| w)).collect();
        self.border_offsets[region.code()] = found.iter().map(|f| f.map(|(_, o)| o)).collect();
        self.border_directions[region.code()] = directions;
    }
}

// ── Geometry helpers ────────────────────────────────────────────

/// The partition corner on the side given by `sign`.
fn corner(b: &IntBox, sign: Direction) -> (i32, i32) {
    let x = if sign.dx < 0 { b.xmin } else { b.xmax };
    let y = if sign.dy < 0 { b.ymin } else { b.ymax };
    (x, y)
}

/// The outside-corner regions `(boundary x, border y)` and
/// `(border x, boundary y)` of the corner on the side given by `sign`.
fn outside_corners(sign: Direction) -> [BorderRegion; 2] {
    [
        BorderRegion::new(Band::boundary(sign.dx), Band::border(sign.dy)),
        BorderRegion::new(Band::border(sign.dx), Band::boundary(sign.dy)),
    ]
}

/// Probe point one cell outside `b` in direction `sign`; a zero component
/// probes the midpoint of that axis.
fn probe(b: &IntBox, sign: Direction) -> (i32, i32) {
    let axis = |s: i32, min: i32, max: i32, size: i32| match s {
        -1 => min - 1,
        1 => max + 1,
        _ => min + size / 2,
    };
    (
        axis(sign.dx, b.xmin, b.xmax, b.xsize()),
        axis(sign.dy, b.ymin, b.ymax, b.ysize()),
    )
}

/// Wrap one coordinate into `[min, max]`, at most once.
fn wrap_axis(v: i32, min: i32, max: i32) -> i32 {
    let size = max - min + 1;
    if v < min {
        v + size
    } else if v > max {
        v - size
    } else {
        v
    }
}

/// Direction from `own` towards `nb`, derived from their extents.
fn derive_direction(own: &IntBox, nb: &IntBox) -> Direction {
    let axis = |own_min: i32, own_max: i32, nb_min: i32, nb_max: i32| {
        if nb_max < own_min {
            -1
        } else if own_max < nb_min {
            1
        } else {
            0
        }
    };
    Direction::new(
        axis(own.xmin, own.xmax, nb.xmin, nb.xmax),
        axis(own.ymin, own.ymax, nb.ymin, nb.ymax),
    )
}

/// Workers `worker` exchanges data with, in ascending order.
///
/// The union of the workers in `worker`'s own map and the workers whose
/// maps reference `worker`. Every channel therefore exists on both ends,
/// even where hardwall fallbacks make the maps asymmetric.
pub fn communication_peers(
    worker: WorkerId,
    table: &PartitionTable,
    boundary_type: BoundaryType,
) -> Result<Vec<WorkerId>, TopologyError> {
    let mut peers = NeighborMap::new(worker, table, boundary_type)?.neighbors();
    for (other, _) in table.iter() {
        if other == worker || peers.contains(&other) {
            continue;
        }
        if NeighborMap::new(other, table, boundary_type)?
            .neighbors()
            .contains(&worker)
        {
            peers.push(other);
        }
    }
    peers.sort_unstable();
    Ok(peers)
}
