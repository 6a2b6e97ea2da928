//! Axis-aligned boxes, cell indices, and compass directions.

use std::fmt;

// ── IntBox ──────────────────────────────────────────────────────

/// An axis-aligned box of integer cell coordinates, inclusive on both ends.
///
/// A partition of the global grid is an `IntBox`; so is the global grid
/// itself (`[0, nx - 1] x [0, ny - 1]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntBox {
    /// Smallest x coordinate inside the box.
    pub xmin: i32,
    /// Largest x coordinate inside the box.
    pub xmax: i32,
    /// Smallest y coordinate inside the box.
    pub ymin: i32,
    /// Largest y coordinate inside the box.
    pub ymax: i32,
}

impl IntBox {
    /// Create a box from its inclusive extents.
    pub const fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Number of cells along x (`xmax - xmin + 1`).
    pub const fn xsize(&self) -> i32 {
        self.xmax - self.xmin + 1
    }

    /// Number of cells along y (`ymax - ymin + 1`).
    pub const fn ysize(&self) -> i32 {
        self.ymax - self.ymin + 1
    }

    /// Total number of cells in the box.
    pub fn cell_count(&self) -> usize {
        (self.xsize().max(0) as usize) * (self.ysize().max(0) as usize)
    }

    /// Whether `(x, y)` lies inside the box.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        self.xmin <= x && x <= self.xmax && self.ymin <= y && y <= self.ymax
    }

    /// The lower corner `(xmin, ymin)`.
    pub const fn min(&self) -> CellIndex {
        CellIndex::new(self.xmin, self.ymin)
    }

    /// The upper corner `(xmax, ymax)`.
    pub const fn max(&self) -> CellIndex {
        CellIndex::new(self.xmax, self.ymax)
    }

    /// The same box moved by `(dx, dy)`.
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.xmin + dx, self.xmax + dx, self.ymin + dy, self.ymax + dy)
    }

    /// The box grown by `margin` cells on every side.
    pub const fn grow(&self, margin: i32) -> Self {
        Self::new(
            self.xmin - margin,
            self.xmax + margin,
            self.ymin - margin,
            self.ymax + margin,
        )
    }

    /// Whether the two boxes share at least one cell.
    pub const fn intersects(&self, other: &IntBox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Iterate all cells in x-major order (x outer, y inner).
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> {
        let b = *self;
        (b.xmin..=b.xmax).flat_map(move |x| (b.ymin..=b.ymax).map(move |y| CellIndex::new(x, y)))
    }
}

impl fmt::Display for IntBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..={}, {}..={}]",
            self.xmin, self.xmax, self.ymin, self.ymax
        )
    }
}

// ── RealBox ─────────────────────────────────────────────────────

/// An axis-aligned box in particle space, half-open: `min <= v < max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealBox {
    /// Lower x bound (inclusive).
    pub xmin: f64,
    /// Upper x bound (exclusive).
    pub xmax: f64,
    /// Lower y bound (inclusive).
    pub ymin: f64,
    /// Upper y bound (exclusive).
    pub ymax: f64,
}

impl RealBox {
    /// Create a box from its extents.
    pub const fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Width of the box.
    pub fn xsize(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the box.
    pub fn ysize(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Whether `(x, y)` lies inside the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.xmin <= x && x < self.xmax && self.ymin <= y && y < self.ymax
    }
}

// ── CellIndex ───────────────────────────────────────────────────

/// Integer coordinates of one cell in some partition's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellIndex {
    /// Create an index.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ── Direction ───────────────────────────────────────────────────

/// Unit step towards a neighbor: each component is -1, 0 or 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Direction {
    /// X component.
    pub dx: i32,
    /// Y component.
    pub dy: i32,
}

impl Direction {
    /// Towards smaller x and smaller y.
    pub const MIN_MIN: Direction = Direction::new(-1, -1);
    /// Towards smaller x.
    pub const MIN_CENTER: Direction = Direction::new(-1, 0);
    /// Towards smaller x and larger y.
    pub const MIN_MAX: Direction = Direction::new(-1, 1);
    /// Towards smaller y.
    pub const CENTER_MIN: Direction = Direction::new(0, -1);
    /// No displacement.
    pub const CENTER: Direction = Direction::new(0, 0);
    /// Towards larger y.
    pub const CENTER_MAX: Direction = Direction::new(0, 1);
    /// Towards larger x and smaller y.
    pub const MAX_MIN: Direction = Direction::new(1, -1);
    /// Towards larger x.
    pub const MAX_CENTER: Direction = Direction::new(1, 0);
    /// Towards larger x and larger y.
    pub const MAX_MAX: Direction = Direction::new(1, 1);

    /// Create a direction from its components.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ── IntBox tests ────────────────────────────────────────────

    #[test]
    fn int_box_sizes_are_inclusive() {
        let b = IntBox::new(0, 15, 8, 15);
        assert_eq!(b.xsize(), 16);
        assert_eq!(b.ysize(), 8);
        assert_eq!(b.cell_count(), 128);
    }

    #[test]
    fn int_box_contains_both_ends() {
        let b = IntBox::new(2, 4, -1, 1);
        assert!(b.contains(2, -1));
        assert!(b.contains(4, 1));
        assert!(!b.contains(5, 0));
        assert!(!b.contains(3, -2));
    }

    #[test]
    fn int_box_cells_are_x_major() {
        let b = IntBox::new(0, 1, 0, 1);
        let cells: Vec<_> = b.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellIndex::new(0, 0),
                CellIndex::new(0, 1),
                CellIndex::new(1, 0),
                CellIndex::new(1, 1),
            ]
        );
    }

    #[test]
    fn grow_and_translate() {
        let b = IntBox::new(0, 3, 0, 1).grow(1).translate(2, -1);
        assert_eq!(b, IntBox::new(1, 6, -2, 1));
        assert!(b.intersects(&IntBox::new(6, 9, 1, 3)));
        assert!(!b.intersects(&IntBox::new(7, 9, 1, 3)));
    }

    // ── RealBox tests ───────────────────────────────────────────

    #[test]
    fn real_box_is_half_open() {
        let b = RealBox::new(0.0, 1.0, 0.0, 2.0);
        assert!(b.contains(0.0, 0.0));
        assert!(!b.contains(1.0, 0.5));
        assert!(!b.contains(0.5, 2.0));
        assert_eq!(b.ysize(), 2.0);
    }

    // ── Property tests ──────────────────────────────────────────

    proptest! {
        #[test]
        fn cells_visits_exactly_cell_count(
            xmin in -5i32..5, w in 1i32..8,
            ymin in -5i32..5, h in 1i32..8,
        ) {
            let b = IntBox::new(xmin, xmin + w - 1, ymin, ymin + h - 1);
            let cells: Vec<_> = b.cells().collect();
            prop_assert_eq!(cells.len(), b.cell_count());
            prop_assert!(cells.iter().all(|c| b.contains(c.x, c.y)));
        }
    }
}
