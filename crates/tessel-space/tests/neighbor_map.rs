//! Neighbor map resolution against known layouts and generic invariants.
//!
//! Specific tests use the 8-partition layout of a 32x32 grid:
//!
//! ```text
//!  5 7
//!  4 6
//!  1 3
//!  0 2
//! ```
//!
//! Generic tests sweep every partition of larger layouts.

use proptest::prelude::*;
use tessel_core::{Direction, WorkerId};
use tessel_space::{
    Band, BorderRegion, BoundaryRegion, BoundaryType, NeighborMap, PartitionTable, Partitioner,
    Side, SimplePartitioner,
};

// ── Helpers ─────────────────────────────────────────────────────

fn layout_32x32() -> PartitionTable {
    SimplePartitioner.partition(32, 32, 8).unwrap()
}

fn map(table: &PartitionTable, worker: u32, bt: BoundaryType) -> NeighborMap {
    NeighborMap::new(WorkerId(worker), table, bt).unwrap()
}

fn boundary(x: Side, y: Side) -> BoundaryRegion {
    BoundaryRegion::new(x, y)
}

fn border(x: Band, y: Band) -> BorderRegion {
    BorderRegion::new(x, y)
}

fn assert_boundary(m: &NeighborMap, region: BoundaryRegion, nb: Option<u32>, dir: Option<(i32, i32)>) {
    assert_eq!(
        m.boundary_neighbor(region),
        nb.map(WorkerId),
        "neighbor of {region:?}"
    );
    assert_eq!(
        m.boundary_direction(region),
        dir.map(|(dx, dy)| Direction::new(dx, dy)),
        "direction of {region:?}"
    );
}

// ── Periodic, partition 0 of 32x32 ──────────────────────────────

#[test]
fn periodic_boundary_neighbors_of_partition_zero() {
    let t = layout_32x32();
    let m = map(&t, 0, BoundaryType::Periodic);
    assert_boundary(&m, boundary(Side::Min, Side::Min), Some(7), Some((-1, -1)));
    assert_boundary(&m, boundary(Side::Max, Side::Max), Some(3), Some((1, 1)));
    assert_boundary(&m, boundary(Side::Min, Side::Max), Some(3), Some((-1, 1)));
    assert_boundary(&m, boundary(Side::Min, Side::Center), Some(2), Some((-1, 0)));
    assert_boundary(&m, boundary(Side::Max, Side::Center), Some(2), Some((1, 0)));
    assert_boundary(&m, boundary(Side::Center, Side::Min), Some(5), Some((0, -1)));
    assert_boundary(&m, boundary(Side::Center, Side::Max), Some(1), Some((0, 1)));
}

#[test]
fn periodic_border_corners_of_partition_zero() {
    let t = layout_32x32();
    let m = map(&t, 0, BoundaryType::Periodic);

    let bottom_left = border(Band::BorderMin, Band::BorderMin);
    assert_eq!(
        m.border_neighbors(bottom_left),
        &[Some(WorkerId(7)), Some(WorkerId(5)), Some(WorkerId(2))]
    );
    assert_eq!(
        m.border_directions(bottom_left),
        &[
            Some(Direction::MIN_MIN),
            Some(Direction::CENTER_MIN),
            Some(Direction::MIN_CENTER)
        ]
    );

    let top_right = border(Band::BorderMax, Band::BorderMax);
    let mut ids: Vec<_> = m.border_neighbors(top_right).iter().flatten().copied().collect();
    ids.sort();
    assert_eq!(ids, vec![WorkerId(1), WorkerId(2), WorkerId(3)]);
}

#[test]
fn periodic_outside_corners_are_unused() {
    let t = layout_32x32();
    for w in 0..8 {
        let m = map(&t, w, BoundaryType::Periodic);
        for region in BorderRegion::OUTSIDE_CORNERS {
            assert_eq!(m.border_neighbors(region), &[None]);
            assert_eq!(m.border_directions(region), &[None]);
        }
    }
}

// ── Hardwall, partition 0 of 32x32 ──────────────────────────────

#[test]
fn hardwall_boundary_neighbors_of_partition_zero() {
    let t = layout_32x32();
    let m = map(&t, 0, BoundaryType::Hardwall);
    // True global corner.
    assert_boundary(&m, boundary(Side::Min, Side::Min), None, None);
    assert_boundary(&m, boundary(Side::Max, Side::Max), Some(3), Some((1, 1)));
    // No diagonal neighbor: the fallback finds the edge-sharing partition above.
    assert_boundary(&m, boundary(Side::Min, Side::Max), Some(1), Some((0, 1)));
    assert_boundary(&m, boundary(Side::Min, Side::Center), None, None);
    assert_boundary(&m, boundary(Side::Max, Side::Center), Some(2), Some((1, 0)));
    assert_boundary(&m, boundary(Side::Center, Side::Max), Some(1), Some((0, 1)));
    assert_boundary(&m, boundary(Side::Center, Side::Min), None, None);
}

#[test]
fn hardwall_border_corner_keeps_empty_slots() {
    let t = layout_32x32();
    let m = map(&t, 0, BoundaryType::Hardwall);
    let top_left = border(Band::BorderMin, Band::BorderMax);
    let slots = m.border_neighbors(top_left);
    assert_eq!(slots.len(), 3);
    assert!(slots.contains(&Some(WorkerId(1))));
    assert!(slots.contains(&None));
}

#[test]
fn hardwall_outside_corners_of_partition_zero() {
    let t = layout_32x32();
    let m = map(&t, 0, BoundaryType::Hardwall);

    let right_below = border(Band::BorderMax, Band::BoundaryMin);
    assert_eq!(m.border_neighbors(right_below), &[Some(WorkerId(2))]);
    assert_eq!(m.border_directions(right_below), &[Some(Direction::MAX_CENTER)]);

    let beyond_right = border(Band::BoundaryMax, Band::BorderMin);
    assert_eq!(m.border_neighbors(beyond_right), &[None]);
    assert_eq!(m.border_directions(beyond_right), &[None]);
}

#[test]
fn hardwall_interior_corner_suppresses_outside_slots() {
    let t = layout_32x32();
    // Partition 3 (x16-31, y8-15) has a diagonal neighbor (4) at its
    // top-left corner, so neither outside slot of that corner is used
    // even though both secondary probes resolve.
    let m = map(&t, 3, BoundaryType::Hardwall);
    let top_left = border(Band::BorderMin, Band::BorderMax);
    assert_eq!(m.border_neighbors(top_left)[0], Some(WorkerId(4)));
    assert_eq!(
        m.border_neighbors(border(Band::BoundaryMin, Band::BorderMax)),
        &[None]
    );
    assert_eq!(
        m.border_neighbors(border(Band::BorderMin, Band::BoundaryMax)),
        &[None]
    );
}

// ── Generic invariants ──────────────────────────────────────────

fn at_min_x(m: &NeighborMap) -> bool {
    m.partition().xmin == m.table().global().xmin
}
fn at_max_x(m: &NeighborMap) -> bool {
    m.partition().xmax == m.table().global().xmax
}
fn at_min_y(m: &NeighborMap) -> bool {
    m.partition().ymin == m.table().global().ymin
}
fn at_max_y(m: &NeighborMap) -> bool {
    m.partition().ymax == m.table().global().ymax
}

fn at_edge(m: &NeighborMap, sx: i32, sy: i32) -> (bool, bool) {
    let x = if sx < 0 { at_min_x(m) } else { at_max_x(m) };
    let y = if sy < 0 { at_min_y(m) } else { at_max_y(m) };
    (x, y)
}

fn check_periodic(table: &PartitionTable) {
    let n = table.len() as u32;
    for w in 0..n {
        let m = map(table, w, BoundaryType::Periodic);
        for region in BoundaryRegion::all().filter(|r| *r != BoundaryRegion::CENTER) {
            let nb = m.boundary_neighbor(region).expect("periodic neighbor");
            assert!(nb.0 < n);
            assert_eq!(m.boundary_direction(region), Some(region.sign()));
        }
        for region in BorderRegion::CORNERS {
            let slots = m.border_neighbors(region);
            assert_eq!(slots.len(), 3);
            assert!(slots.iter().all(|s| s.is_some_and(|id| id.0 < n)));
        }
        for region in BorderRegion::EDGES {
            assert_eq!(m.border_neighbors(region).len(), 1);
        }
    }
}

fn check_hardwall(table: &PartitionTable) {
    for w in 0..table.len() as u32 {
        let m = map(table, w, BoundaryType::Hardwall);
        for region in BorderRegion::CORNERS {
            let s = region.sign();
            let slots = m.border_neighbors(region);
            assert_eq!(slots.len(), 3);
            let valid = slots.iter().filter(|s| s.is_some()).count();
            let expected = match at_edge(&m, s.dx, s.dy) {
                (true, true) => 0,
                (true, false) | (false, true) => 1,
                (false, false) => 3,
            };
            assert_eq!(valid, expected, "worker {w} corner {region:?}");

            let outside_x = border(Band::boundary(s.dx), Band::border(s.dy));
            let outside_y = border(Band::border(s.dx), Band::boundary(s.dy));
            let (edge_x, edge_y) = at_edge(&m, s.dx, s.dy);
            assert_eq!(
                m.border_neighbors(outside_x)[0].is_some(),
                edge_x && !edge_y,
                "worker {w} outside {outside_x:?}"
            );
            assert_eq!(
                m.border_neighbors(outside_y)[0].is_some(),
                edge_y && !edge_x,
                "worker {w} outside {outside_y:?}"
            );

            // Precedence: never a diagonal neighbor and an outside slot at once.
            if slots[0].is_some() {
                assert!(m.border_neighbors(outside_x)[0].is_none());
                assert!(m.border_neighbors(outside_y)[0].is_none());
            }
        }
        for region in BoundaryRegion::CORNERS {
            let s = region.sign();
            let nb = m.boundary_neighbor(region);
            match at_edge(&m, s.dx, s.dy) {
                (true, true) => {
                    assert_eq!(nb, None);
                    assert_eq!(m.boundary_direction(region), None);
                }
                _ => assert!(nb.is_some(), "worker {w} corner {region:?}"),
            }
        }
    }
}

#[test]
fn periodic_64x128_with_32_partitions() {
    check_periodic(&SimplePartitioner.partition(64, 128, 32).unwrap());
}

#[test]
fn hardwall_64x128_with_32_partitions() {
    check_hardwall(&SimplePartitioner.partition(64, 128, 32).unwrap());
}

#[test]
fn hardwall_outside_corner_rule_on_bottom_right() {
    let t = SimplePartitioner.partition(64, 128, 32).unwrap();
    let g = t.global();
    for w in 0..32 {
        let m = map(&t, w, BoundaryType::Hardwall);
        let slot = m.border_neighbors(border(Band::BoundaryMax, Band::BorderMin))[0];
        let p = m.partition();
        assert_eq!(slot.is_some(), p.xmax == g.xmax && p.ymin != g.ymin);
    }
}

proptest! {
    #[test]
    fn invariants_hold_for_random_layouts(
        nx in 4i32..48,
        ny in 4i32..48,
        exp in 0u32..5,
    ) {
        if let Ok(t) = SimplePartitioner.partition(nx, ny, 1usize << exp) {
            check_periodic(&t);
            check_hardwall(&t);
        }
    }
}
