//! Node configuration, validation, and error types.
//!
//! [`NodeConfig`] is supplied programmatically by whoever launches a
//! node. [`validate()`](NodeConfig::validate) checks it against the
//! physics grid before any group membership is attempted.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tessel_space::{BoundaryType, PartitionError, Partitioner, SimplePartitioner};

use crate::physics::GridSettings;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`NodeConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The partition count is zero.
    NoPartitions,
    /// The partition count is not a power of two.
    PartitionsNotPowerOfTwo {
        /// The configured count.
        configured: usize,
    },
    /// The grid cannot be split into the configured number of partitions.
    Partition(PartitionError),
    /// The cell size is not finite and positive.
    InvalidCellSize {
        /// The configured width.
        width: f64,
        /// The configured height.
        height: f64,
    },
    /// The group name is empty.
    EmptyName,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPartitions => write!(f, "partition count must be at least 1"),
            Self::PartitionsNotPowerOfTwo { configured } => {
                write!(f, "partition count {configured} is not a power of two")
            }
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::InvalidCellSize { width, height } => {
                write!(f, "cell size must be finite and positive, got {width} x {height}")
            }
            Self::EmptyName => write!(f, "group name must not be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionError> for ConfigError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

// ── NodeConfig ─────────────────────────────────────────────────────

/// Configuration of one node of a distributed run.
///
/// Every node of a group must be given the same configuration.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Number of workers, and therefore partitions. Default: 1.
    pub partitions: usize,
    /// Boundary condition at the global edge. Default: periodic.
    pub boundary: BoundaryType,
    /// Steps taken by [`Node::run`](crate::Node::run). Default: 0.
    pub iterations: u64,
    /// Delay before channels are closed, letting unacknowledged sends
    /// drain. Default: 100 ms.
    pub close_grace: Duration,
    /// Name of the group to join. Default: `"tessel"`.
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            partitions: 1,
            boundary: BoundaryType::Periodic,
            iterations: 0,
            close_grace: Duration::from_millis(100),
            name: "tessel".to_string(),
        }
    }
}

impl NodeConfig {
    /// Check the configuration against the physics grid.
    ///
    /// The partition count must be a non-zero power of two, and every
    /// partition must come out at least two cells wide on both axes.
    pub fn validate(&self, grid: &GridSettings) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::NoPartitions);
        }
        if !self.partitions.is_power_of_two() {
            return Err(ConfigError::PartitionsNotPowerOfTwo {
                configured: self.partitions,
            });
        }
        let size_ok = |v: f64| v.is_finite() && v > 0.0;
        if !size_ok(grid.cell_width) || !size_ok(grid.cell_height) {
            return Err(ConfigError::InvalidCellSize {
                width: grid.cell_width,
                height: grid.cell_height,
            });
        }
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        SimplePartitioner.partition(grid.nx, grid.ny, self.partitions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(nx: i32, ny: i32) -> GridSettings {
        GridSettings {
            nx,
            ny,
            cell_width: 1.0,
            cell_height: 1.0,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(NodeConfig::default().validate(&grid(8, 8)).is_ok());
    }

    #[test]
    fn zero_partitions_rejected() {
        let cfg = NodeConfig {
            partitions: 0,
            ..NodeConfig::default()
        };
        assert_eq!(cfg.validate(&grid(8, 8)), Err(ConfigError::NoPartitions));
    }

    #[test]
    fn non_power_of_two_rejected() {
        let cfg = NodeConfig {
            partitions: 6,
            ..NodeConfig::default()
        };
        assert_eq!(
            cfg.validate(&grid(32, 32)),
            Err(ConfigError::PartitionsNotPowerOfTwo { configured: 6 })
        );
    }

    #[test]
    fn too_many_partitions_for_grid_rejected() {
        let cfg = NodeConfig {
            partitions: 16,
            ..NodeConfig::default()
        };
        assert!(matches!(
            cfg.validate(&grid(4, 4)),
            Err(ConfigError::Partition(PartitionError::PartitionTooSmall { .. }))
        ));
    }

    #[test]
    fn uneven_grid_is_valid() {
        let cfg = NodeConfig {
            partitions: 4,
            ..NodeConfig::default()
        };
        assert!(cfg.validate(&grid(17, 33)).is_ok());
    }

    #[test]
    fn bad_cell_size_rejected() {
        let mut g = grid(8, 8);
        g.cell_height = f64::NAN;
        assert!(matches!(
            NodeConfig::default().validate(&g),
            Err(ConfigError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn error_display_names_the_count() {
        let e = ConfigError::PartitionsNotPowerOfTwo { configured: 3 };
        assert!(e.to_string().contains('3'));
    }
}
