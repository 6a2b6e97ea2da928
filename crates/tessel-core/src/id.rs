//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one worker (one partition) of a distributed run.
///
/// Worker IDs are dense: a run with `N` workers uses `WorkerId(0)`
/// through `WorkerId(N - 1)`, and `WorkerId(n)` owns the n-th box of
/// the partition table. The absence of a neighbor is expressed as
/// `Option<WorkerId>::None` rather than a sentinel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// The worker's position in the partition table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
