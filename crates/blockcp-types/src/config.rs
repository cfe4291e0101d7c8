//! Copy configuration
//!
//! A [`CopyConfig`] carries everything the controller needs that does not come
//! from the devices themselves. Validation here covers the bounds that can be
//! checked without device facts; sector-size-dependent checks happen at
//! preflight once the destination has been probed.

use crate::{Error, Result};

/// Default number of worker threads (one outstanding I/O chain each)
pub const DEFAULT_WORKERS: usize = 4;

/// Default block size in bytes (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Maximum allowed worker count
pub const MAX_WORKERS: usize = 64;

/// Configuration for a block copy operation
#[derive(Debug, Clone)]
pub struct CopyConfig {
    /// Number of worker threads, each owning one I/O slot (1-64)
    pub workers: usize,
    /// Block size in bytes; must end up a multiple of the destination sector size
    pub block_size: usize,
    /// Open devices with direct/unbuffered I/O flags
    pub direct_io: bool,
    /// Sector size to assume when the destination's cannot be discovered.
    /// `None` makes an unknown sector size a preflight failure.
    pub assume_sector_size: Option<u32>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            block_size: DEFAULT_BLOCK_SIZE,
            direct_io: true,
            assume_sector_size: None,
        }
    }
}

impl CopyConfig {
    /// Create a configuration with an explicit worker count and block size in MiB
    pub fn new(workers: usize, block_size_mb: usize) -> Self {
        Self {
            workers,
            block_size: block_size_mb * 1024 * 1024,
            ..Self::default()
        }
    }

    /// Validate the device-independent invariants
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(Error::config(format!(
                "worker count must be between 1 and {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }
        if self.block_size == 0 {
            return Err(Error::config("block size must be positive"));
        }
        if let Some(sector) = self.assume_sector_size {
            if sector == 0 || !sector.is_power_of_two() {
                return Err(Error::config(format!(
                    "assumed sector size must be a power of two, got {}",
                    sector
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CopyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert!(config.direct_io);
    }

    #[test]
    fn test_block_size_from_mb() {
        let config = CopyConfig::new(8, 4);
        assert_eq!(config.workers, 8);
        assert_eq!(config.block_size, 4 * 1024 * 1024);
    }

    #[test]
    fn test_rejects_worker_bounds() {
        let mut config = CopyConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());
        config.workers = MAX_WORKERS + 1;
        assert!(config.validate().is_err());
        config.workers = MAX_WORKERS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_block_size() {
        let mut config = CopyConfig::default();
        config.block_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_power_of_two_fallback_sector() {
        let mut config = CopyConfig::default();
        config.assume_sector_size = Some(4097);
        assert!(config.validate().is_err());
        config.assume_sector_size = Some(4096);
        assert!(config.validate().is_ok());
    }
}
