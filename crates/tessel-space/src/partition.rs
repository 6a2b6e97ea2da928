//! Splitting the global grid into one box per worker.

use tessel_core::{IntBox, WorkerId};

use crate::error::PartitionError;

/// Smallest number of cells a partition may have along either axis.
///
/// The border strip is one cell wide on each side, so a partition needs
/// at least two cells for its lower and upper strips not to coincide.
pub const MIN_PARTITION_CELLS: i32 = 2;

// ── PartitionTable ──────────────────────────────────────────────

/// The immutable, validated assignment of one box per worker.
///
/// Box `n` belongs to `WorkerId(n)`. Boxes are pairwise disjoint and
/// their union is exactly the global box. Boxes also form a lattice:
/// any two boxes either occupy the same columns or disjoint columns,
/// and likewise for rows. Every edge of a box therefore faces exactly
/// one other box, which the neighbor probes rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionTable {
    global: IntBox,
    boxes: Vec<IntBox>,
}

impl PartitionTable {
    /// Validate `boxes` against `global` and build the table.
    pub fn new(global: IntBox, boxes: Vec<IntBox>) -> Result<Self, PartitionError> {
        if boxes.is_empty() {
            return Err(PartitionError::NoPartitions);
        }
        let mut covered = 0;
        for (i, b) in boxes.iter().enumerate() {
            if b.xsize() < 1 || b.ysize() < 1 {
                return Err(PartitionError::PartitionTooSmall {
                    partition: *b,
                    min_cells: 1,
                });
            }
            if !(global.contains(b.xmin, b.ymin) && global.contains(b.xmax, b.ymax)) {
                return Err(PartitionError::OutsideGlobal {
                    partition: *b,
                    global,
                });
            }
            for (j, other) in boxes.iter().enumerate().skip(i + 1) {
                let (a, b_id) = (WorkerId(i as u32), WorkerId(j as u32));
                if b.intersects(other) {
                    return Err(PartitionError::Overlap { a, b: b_id });
                }
                let x_misaligned = ranges_cross(b.xmin, b.xmax, other.xmin, other.xmax);
                let y_misaligned = ranges_cross(b.ymin, b.ymax, other.ymin, other.ymax);
                if x_misaligned || y_misaligned {
                    return Err(PartitionError::Misaligned { a, b: b_id });
                }
            }
            covered += b.cell_count();
        }
        if covered != global.cell_count() {
            return Err(PartitionError::IncompleteCover {
                covered,
                expected: global.cell_count(),
            });
        }
        Ok(Self { global, boxes })
    }

    /// The global box the table tiles.
    pub fn global(&self) -> IntBox {
        self.global
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Always false: a validated table has at least one partition.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// The box owned by `worker`.
    pub fn get(&self, worker: WorkerId) -> Option<&IntBox> {
        self.boxes.get(worker.index())
    }

    /// All boxes, indexed by worker.
    pub fn boxes(&self) -> &[IntBox] {
        &self.boxes
    }

    /// `(worker, box)` pairs in worker order.
    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, &IntBox)> {
        self.boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (WorkerId(i as u32), b))
    }

    /// The worker owning cell `(x, y)`, by linear scan.
    pub fn owner_of(&self, x: i32, y: i32) -> Option<WorkerId> {
        self.boxes
            .iter()
            .position(|b| b.contains(x, y))
            .map(|i| WorkerId(i as u32))
    }
}

/// Two inclusive ranges overlap without being equal.
fn ranges_cross(amin: i32, amax: i32, bmin: i32, bmax: i32) -> bool {
    amin <= bmax && bmin <= amax && (amin, amax) != (bmin, bmax)
}

// ── Partitioner ─────────────────────────────────────────────────

/// Produces a partition table for a grid.
pub trait Partitioner {
    /// Split a `nx x ny` grid into `count` partitions.
    fn partition(&self, nx: i32, ny: i32, count: usize) -> Result<PartitionTable, PartitionError>;
}

/// Recursive bisection for power-of-two partition counts.
///
/// Each level of the recursion halves every box along the same axis:
/// the axis whose nominal partition size (grid size over the number of
/// slices so far) is longer, y on ties. Because the axis only depends
/// on the depth, the result is a lattice even when halving leaves
/// uneven sizes. The lower half is emitted first, so for a 32x32 grid
/// and 8 partitions the layout is:
///
/// ```text
///  y 24-31 |  5  |  7  |
///  y 16-23 |  4  |  6  |
///  y  8-15 |  1  |  3  |
///  y  0- 7 |  0  |  2  |
///            x0-15 x16-31
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplePartitioner;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl SimplePartitioner {
    /// The split axis of every recursion level for `count` partitions.
    fn split_axes(nx: i32, ny: i32, count: usize) -> Vec<Axis> {
        let (mut px, mut py) = (1i64, 1i64);
        let mut axes = Vec::new();
        let mut remaining = count;
        while remaining > 1 {
            // nx / px > ny / py, without rounding.
            if i64::from(nx) * py > i64::from(ny) * px {
                axes.push(Axis::X);
                px *= 2;
            } else {
                axes.push(Axis::Y);
                py *= 2;
            }
            remaining /= 2;
        }
        axes
    }

    fn split(b: IntBox, axes: &[Axis], out: &mut Vec<IntBox>) {
        let Some((&axis, rest)) = axes.split_first() else {
            out.push(b);
            return;
        };
        let (lower, upper) = match axis {
            Axis::X => {
                let mid = b.xmin + b.xsize() / 2;
                (
                    IntBox::new(b.xmin, mid - 1, b.ymin, b.ymax),
                    IntBox::new(mid, b.xmax, b.ymin, b.ymax),
                )
            }
            Axis::Y => {
                let mid = b.ymin + b.ysize() / 2;
                (
                    IntBox::new(b.xmin, b.xmax, b.ymin, mid - 1),
                    IntBox::new(b.xmin, b.xmax, mid, b.ymax),
                )
            }
        };
        Self::split(lower, rest, out);
        Self::split(upper, rest, out);
    }
}

impl Partitioner for SimplePartitioner {
    fn partition(&self, nx: i32, ny: i32, count: usize) -> Result<PartitionTable, PartitionError> {
        if count == 0 {
            return Err(PartitionError::NoPartitions);
        }
        if !count.is_power_of_two() {
            return Err(PartitionError::NotPowerOfTwo { count });
        }
        let global = IntBox::new(0, nx - 1, 0, ny - 1);
        let mut boxes = Vec::with_capacity(count);
        Self::split(global, &Self::split_axes(nx, ny, count), &mut boxes);
        if let Some(small) = boxes
            .iter()
            .find(|b| b.xsize() < MIN_PARTITION_CELLS || b.ysize() < MIN_PARTITION_CELLS)
        {
            return Err(PartitionError::PartitionTooSmall {
                partition: *small,
                min_cells: MIN_PARTITION_CELLS,
            });
        }
        PartitionTable::new(global, boxes)
    }
}
