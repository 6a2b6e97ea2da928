//! Compass-direction region codes around and inside a partition.
//!
//! Two vocabularies are used:
//!
//! - [`BoundaryRegion`] (3x3): where a point lies relative to the
//!   partition's area: below, inside, or above on each axis. Used to
//!   decide where *incoming* data comes from and where leaving
//!   particles go.
//! - [`BorderRegion`] (5x5): a finer split that also distinguishes the
//!   one-cell-wide border strip just inside each edge. Used to decide
//!   which neighbors need a copy of a local cell or particle.
//!
//! Each region has a dense integer code (`x + 3y` and `x + 5y`
//! respectively) so tables can be plain arrays.

use tessel_core::{Direction, RealBox};

// ── Side / BoundaryRegion ───────────────────────────────────────

/// Position along one axis relative to an area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Below the area's lower bound.
    Min,
    /// Inside the area.
    Center,
    /// At or past the area's upper bound.
    Max,
}

impl Side {
    const ALL: [Side; 3] = [Side::Min, Side::Center, Side::Max];

    fn ordinal(self) -> usize {
        self as usize
    }

    /// -1, 0 or 1.
    pub fn sign(self) -> i32 {
        self as i32 - 1
    }

    fn classify(v: f64, min: f64, max: f64) -> Side {
        if v < min {
            Side::Min
        } else if v >= max {
            Side::Max
        } else {
            Side::Center
        }
    }
}

/// One of the 9 regions of the plane around a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundaryRegion {
    /// X component.
    pub x: Side,
    /// Y component.
    pub y: Side,
}

impl BoundaryRegion {
    /// Number of distinct codes.
    pub const COUNT: usize = 9;

    /// The partition's own area.
    pub const CENTER: BoundaryRegion = BoundaryRegion::new(Side::Center, Side::Center);

    /// Regions sharing an edge with the area.
    pub const EDGES: [BoundaryRegion; 4] = [
        BoundaryRegion::new(Side::Min, Side::Center),
        BoundaryRegion::new(Side::Max, Side::Center),
        BoundaryRegion::new(Side::Center, Side::Min),
        BoundaryRegion::new(Side::Center, Side::Max),
    ];

    /// Regions sharing only a corner with the area.
    pub const CORNERS: [BoundaryRegion; 4] = [
        BoundaryRegion::new(Side::Min, Side::Min),
        BoundaryRegion::new(Side::Max, Side::Min),
        BoundaryRegion::new(Side::Min, Side::Max),
        BoundaryRegion::new(Side::Max, Side::Max),
    ];

    /// Create a region from its components.
    pub const fn new(x: Side, y: Side) -> Self {
        Self { x, y }
    }

    /// Dense code `x + 3y` in `0..9`.
    pub fn code(self) -> usize {
        self.x.ordinal() + 3 * self.y.ordinal()
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: usize) -> Option<Self> {
        if code >= Self::COUNT {
            return None;
        }
        Some(Self::new(Side::ALL[code % 3], Side::ALL[code / 3]))
    }

    /// Every region in code order.
    pub fn all() -> impl Iterator<Item = BoundaryRegion> {
        (0..Self::COUNT).filter_map(Self::from_code)
    }

    /// Unit vector pointing from the area towards this region.
    pub fn sign(self) -> Direction {
        Direction::new(self.x.sign(), self.y.sign())
    }

    /// Classify `(x, y)` against `area`.
    pub fn classify(area: &RealBox, x: f64, y: f64) -> Self {
        Self::new(
            Side::classify(x, area.xmin, area.xmax),
            Side::classify(y, area.ymin, area.ymax),
        )
    }
}

// ── Band / BorderRegion ─────────────────────────────────────────

/// Position along one axis with the border strip singled out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    /// Below the simulation area.
    BoundaryMin,
    /// Inside, within the lower border strip.
    BorderMin,
    /// Inside, away from both border strips.
    Center,
    /// Inside, within the upper border strip.
    BorderMax,
    /// At or past the upper bound of the simulation area.
    BoundaryMax,
}

impl Band {
    const ALL: [Band; 5] = [
        Band::BoundaryMin,
        Band::BorderMin,
        Band::Center,
        Band::BorderMax,
        Band::BoundaryMax,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    /// -1 for the lower bands, 1 for the upper bands, 0 for the center.
    pub fn sign(self) -> i32 {
        match self {
            Band::BoundaryMin | Band::BorderMin => -1,
            Band::Center => 0,
            Band::BorderMax | Band::BoundaryMax => 1,
        }
    }

    /// The border band on the side given by `sign` (-1 or 1).
    pub fn border(sign: i32) -> Band {
        if sign < 0 {
            Band::BorderMin
        } else {
            Band::BorderMax
        }
    }

    /// The boundary band on the side given by `sign` (-1 or 1).
    pub fn boundary(sign: i32) -> Band {
        if sign < 0 {
            Band::BoundaryMin
        } else {
            Band::BoundaryMax
        }
    }

    fn classify(v: f64, sim_min: f64, inner_min: f64, inner_max: f64, sim_max: f64) -> Band {
        if v < sim_min {
            Band::BoundaryMin
        } else if v < inner_min {
            Band::BorderMin
        } else if v < inner_max {
            Band::Center
        } else if v < sim_max {
            Band::BorderMax
        } else {
            Band::BoundaryMax
        }
    }
}

/// One of the 25 border regions of a partition.
///
/// Most regions are unused. Those that matter are the 4 [`EDGES`](Self::EDGES),
/// the 4 [`CORNERS`](Self::CORNERS) and the 8
/// [`OUTSIDE_CORNERS`](Self::OUTSIDE_CORNERS): slots just outside one
/// edge but within the border strip of the other axis. Outside corners
/// only carry data under hardwall boundaries, where a missing diagonal
/// neighbor has to be replaced by an edge-sharing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BorderRegion {
    /// X component.
    pub x: Band,
    /// Y component.
    pub y: Band,
}

impl BorderRegion {
    /// Number of distinct codes.
    pub const COUNT: usize = 25;

    /// Regions sharing an edge with the inner area.
    pub const EDGES: [BorderRegion; 4] = [
        BorderRegion::new(Band::BorderMin, Band::Center),
        BorderRegion::new(Band::BorderMax, Band::Center),
        BorderRegion::new(Band::Center, Band::BorderMin),
        BorderRegion::new(Band::Center, Band::BorderMax),
    ];

    /// Regions sharing a corner with the inner area.
    pub const CORNERS: [BorderRegion; 4] = [
        BorderRegion::new(Band::BorderMin, Band::BorderMin),
        BorderRegion::new(Band::BorderMax, Band::BorderMin),
        BorderRegion::new(Band::BorderMin, Band::BorderMax),
        BorderRegion::new(Band::BorderMax, Band::BorderMax),
    ];

    /// Regions outside the simulation area along one axis only.
    pub const OUTSIDE_CORNERS: [BorderRegion; 8] = [
        BorderRegion::new(Band::BorderMin, Band::BoundaryMin),
        BorderRegion::new(Band::BorderMin, Band::BoundaryMax),
        BorderRegion::new(Band::BorderMax, Band::BoundaryMin),
        BorderRegion::new(Band::BorderMax, Band::BoundaryMax),
        BorderRegion::new(Band::BoundaryMin, Band::BorderMin),
        BorderRegion::new(Band::BoundaryMax, Band::BorderMin),
        BorderRegion::new(Band::BoundaryMin, Band::BorderMax),
        BorderRegion::new(Band::BoundaryMax, Band::BorderMax),
    ];

    /// Create a region from its components.
    pub const fn new(x: Band, y: Band) -> Self {
        Self { x, y }
    }

    /// Dense code `x + 5y` in `0..25`.
    pub fn code(self) -> usize {
        self.x.ordinal() + 5 * self.y.ordinal()
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: usize) -> Option<Self> {
        if code >= Self::COUNT {
            return None;
        }
        Some(Self::new(Band::ALL[code % 5], Band::ALL[code / 5]))
    }

    /// Every region in code order.
    pub fn all() -> impl Iterator<Item = BorderRegion> {
        (0..Self::COUNT).filter_map(Self::from_code)
    }

    /// Unit vector pointing from the center towards this region.
    pub fn sign(self) -> Direction {
        Direction::new(self.x.sign(), self.y.sign())
    }

    /// Classify `(x, y)` against the simulation area and the inner area
    /// (the simulation area minus its border strips).
    pub fn classify(sim: &RealBox, inner: &RealBox, x: f64, y: f64) -> Self {
        Self::new(
            Band::classify(x, sim.xmin, inner.xmin, inner.xmax, sim.xmax),
            Band::classify(y, sim.ymin, inner.ymin, inner.ymax, sim.ymax),
        )
    }
}
