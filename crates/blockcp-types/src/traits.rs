//! Adapter traits supplied by the host platform

use std::fs::File;
use std::path::Path;

use crate::Result;

/// Supplies the device facts the copy engine needs but does not discover itself.
///
/// The engine consumes exactly three facts: how many bytes the source holds,
/// how many bytes the destination can accept, and the destination's sector
/// size. A `sector_size` of 0 means "unknown"; whether to abort or assume a
/// default is the embedding application's policy (see
/// [`CopyConfig::assume_sector_size`](crate::CopyConfig)).
///
/// Tests substitute fixed-value implementations to drive preflight scenarios
/// without real devices.
pub trait DiskInfo {
    /// Total readable bytes of the source
    fn source_len(&self, src: &File) -> Result<u64>;

    /// Total writable bytes of the destination
    fn dest_capacity(&self, dst: &File, path: &Path) -> Result<u64>;

    /// Destination sector size in bytes; 0 when it cannot be determined
    fn sector_size(&self, dst: &File, path: &Path) -> Result<u32>;
}
