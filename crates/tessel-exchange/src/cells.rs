//! Which local cells are exported to which neighbor, and where they land.

use tessel_core::{CellIndex, RealBox, WorkerId, INTERPOLATION_RADIUS};
use tessel_space::{BorderRegion, NeighborMap};

/// One exported cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderCell {
    /// The receiving neighbor.
    pub neighbor: WorkerId,
    /// The cell in the local frame.
    pub local: CellIndex,
    /// The ghost slot it fills in the neighbor's frame.
    pub remote: CellIndex,
}

/// Every cell of an `nx x ny` grid (plus an [`INTERPOLATION_RADIUS`]
/// ring) that a neighbor reads through its ghost margin.
///
/// Each cell is classified into a border region by its center; every
/// valid neighbor of that region gets the cell, mapped into its frame by
/// the frame offset recorded for that neighbor slot. Cells are listed
/// x-major, so each neighbor's exports come out in a fixed order.
pub fn border_cell_plan(
    map: &NeighborMap,
    nx: i32,
    ny: i32,
    cell_size: (f64, f64),
) -> Vec<BorderCell> {
    let (cw, ch) = cell_size;
    let r = INTERPOLATION_RADIUS;
    let sim = RealBox::new(0.0, nx as f64 * cw, 0.0, ny as f64 * ch);
    let inner = RealBox::new(
        r as f64 * cw,
        sim.xmax - r as f64 * cw,
        r as f64 * ch,
        sim.ymax - r as f64 * ch,
    );

    let mut out = Vec::new();
    for x in -r..nx + r {
        for y in -r..ny + r {
            let cx = (x as f64 + 0.5) * cw;
            let cy = (y as f64 + 0.5) * ch;
            let region = BorderRegion::classify(&sim, &inner, cx, cy);
            let slots = map
                .border_neighbors(region)
                .iter()
                .zip(map.border_offsets(region));
            for pair in slots {
                if let (Some(nb), Some(off)) = pair {
                    out.push(BorderCell {
                        neighbor: *nb,
                        local: CellIndex::new(x, y),
                        remote: CellIndex::new(x - off.x, y - off.y),
                    });
                }
            }
        }
    }
    out
}
