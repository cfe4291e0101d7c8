//! The copy controller
//!
//! Sequencing: discover device facts through the [`DiskInfo`] adapter,
//! validate them against the configuration, allocate every ring and slot up
//! front (allocation failure is fatal before any I/O), spawn one worker per
//! slot, sample progress until the termination predicate holds, join, and
//! flush the destination. The result is success only if no failure was
//! recorded anywhere along the way.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use blockcp_device::{open_destination, open_source};
use blockcp_io::{CopyPump, IoSlot, SlotRing, Worker};
use blockcp_types::{CopyConfig, CopyProgress, CopyStats, DiskInfo, Error, Result};
use tracing::{debug, info};

use crate::monitor::ProgressMonitor;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

// Buffers are page-aligned even when the device would accept less.
const PAGE_ALIGN: usize = 4096;

/// Drives one block copy from preflight through flush
#[derive(Debug)]
pub struct Controller {
    config: CopyConfig,
}

impl Controller {
    /// Create a controller with a validated configuration
    pub fn new(config: CopyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The controller's configuration
    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Open both devices and run the copy.
    ///
    /// The source is opened read-only and the destination write-only without
    /// sharing, both with direct/unbuffered flags when configured.
    pub fn copy<D: DiskInfo>(
        &self,
        source: &Path,
        destination: &Path,
        disk_info: &D,
        on_progress: impl FnMut(CopyProgress),
    ) -> Result<CopyStats> {
        let src = open_source(source, self.config.direct_io)?;
        let dst = open_destination(destination, self.config.direct_io)?;
        info!(
            source = %source.display(),
            destination = %destination.display(),
            "devices opened"
        );
        self.copy_with_handles(&src, &dst, destination, disk_info, on_progress)
    }

    /// Run the copy over handles the caller already opened
    pub fn copy_with_handles<D: DiskInfo>(
        &self,
        src: &File,
        dst: &File,
        dst_path: &Path,
        disk_info: &D,
        mut on_progress: impl FnMut(CopyProgress),
    ) -> Result<CopyStats> {
        let (source_len, sector_size) = self.preflight(src, dst, dst_path, disk_info)?;
        let block_size = self.config.block_size;
        let workers = self.config.workers;

        // Every slot and ring exists before the first read is issued; an
        // allocation failure here aborts with nothing in flight.
        let align = (sector_size as usize).max(PAGE_ALIGN);
        let mut lanes = Vec::with_capacity(workers);
        for _ in 0..workers {
            let ring = SlotRing::new().map_err(|source| Error::Ring { source })?;
            let slot = IoSlot::new(block_size, align)?;
            if slot.buffer().as_ptr() as usize % sector_size as usize != 0 {
                return Err(Error::config(format!(
                    "allocated buffer is not aligned to sector size {}",
                    sector_size
                )));
            }
            lanes.push((ring, slot));
        }

        let started = Instant::now();
        let pump = CopyPump::new(src, dst, source_len, block_size, sector_size);

        std::thread::scope(|scope| {
            let pump = &pump;
            for (id, (ring, slot)) in lanes.into_iter().enumerate() {
                scope.spawn(move || Worker::new(id, pump, ring, slot).run());
            }
            ProgressMonitor::new(PROGRESS_INTERVAL).watch(pump, &mut on_progress);
            // Workers drain their own chains; the scope join is the only
            // synchronization left.
            debug!("termination predicate reached, joining workers");
        });

        if let Err(source) = dst.sync_all() {
            pump.fail(Error::Flush { source });
        }

        // Reflect the post-join totals in the last progress report.
        on_progress(pump.progress());

        if let Some(err) = pump.take_error() {
            return Err(err);
        }

        let stats = CopyStats {
            bytes_read: pump.bytes_read(),
            bytes_written: pump.bytes_written(),
            duration: started.elapsed(),
        };
        info!(
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            duration_ms = stats.duration.as_millis() as u64,
            "copy completed"
        );
        Ok(stats)
    }

    /// Validate sizes and alignment before any I/O is issued.
    ///
    /// Returns the source length and the resolved sector size.
    fn preflight<D: DiskInfo>(
        &self,
        src: &File,
        dst: &File,
        dst_path: &Path,
        disk_info: &D,
    ) -> Result<(u64, u32)> {
        let source_len = disk_info.source_len(src)?;
        let capacity = disk_info.dest_capacity(dst, dst_path)?;

        let sector_size = match disk_info.sector_size(dst, dst_path)? {
            0 => self.config.assume_sector_size.ok_or_else(|| {
                Error::config(
                    "destination sector size could not be determined and no fallback is configured",
                )
            })?,
            discovered => discovered,
        };

        if sector_size == 0 || !sector_size.is_power_of_two() {
            return Err(Error::config(format!(
                "destination sector size {} is not a power of two",
                sector_size
            )));
        }
        if self.config.block_size % sector_size as usize != 0 {
            return Err(Error::config(format!(
                "block size {} is not a multiple of the destination sector size {}",
                self.config.block_size, sector_size
            )));
        }
        if capacity < source_len {
            return Err(Error::config(format!(
                "destination capacity {} bytes is smaller than the source length {} bytes",
                capacity, source_len
            )));
        }

        info!(
            source_mb = source_len / (1024 * 1024),
            destination_mb = capacity / (1024 * 1024),
            sector_size,
            workers = self.config.workers,
            block_size_mb = self.config.block_size / (1024 * 1024),
            "preflight passed"
        );
        Ok((source_len, sector_size))
    }
}
