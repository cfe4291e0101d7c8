//! Worker loop
//!
//! Each worker thread is bound to one slot and one ring for the engine's
//! lifetime. It primes a single read, then alternates between parking on its
//! own ring and acting on the completion that wakes it: a read completion
//! chains a write inside the pump, a write completion frees the slot and the
//! worker claims the next block. Because a worker's ring only ever carries
//! its own chain, the worker can exit the moment its slot has no more work -
//! there is nothing else its wait could ever deliver.

use blockcp_types::Error;
use tracing::debug;

use crate::pump::{CopyPump, IssueOutcome};
use crate::ring::SlotRing;
use crate::slot::IoSlot;

/// A cooperative worker driving one I/O slot
#[derive(Debug)]
pub struct Worker<'a> {
    id: usize,
    pump: &'a CopyPump,
    ring: SlotRing,
    slot: IoSlot,
}

impl<'a> Worker<'a> {
    /// Bind a worker to its pump, ring, and slot
    pub fn new(id: usize, pump: &'a CopyPump, ring: SlotRing, slot: IoSlot) -> Self {
        Self {
            id,
            pump,
            ring,
            slot,
        }
    }

    /// Run the copy loop until this worker's slot has drained or the copy
    /// aborts
    pub fn run(mut self) {
        debug!(worker = self.id, "worker started");

        if self.pump.issue_read(&mut self.ring, &mut self.slot) == IssueOutcome::NoMoreWork {
            debug!(worker = self.id, "nothing to do on priming read");
            return;
        }

        loop {
            let completion = match self.ring.wait_completion() {
                Ok(completion) => completion,
                Err(source) => {
                    self.pump.fail(Error::Ring { source });
                    // The kernel may still complete the in-flight transfer
                    // into this slot's buffer; the allocation must outlive it.
                    std::mem::forget(self.slot);
                    return;
                }
            };

            self.pump
                .dispatch(completion, &mut self.ring, &mut self.slot);

            if !self.slot.completed {
                // A write was chained on this slot; park for it.
                continue;
            }
            self.slot.completed = false;

            if self.pump.errored() || self.pump.reads_done() {
                break;
            }
            if self.pump.issue_read(&mut self.ring, &mut self.slot) == IssueOutcome::NoMoreWork {
                break;
            }
        }

        debug!(worker = self.id, "worker finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn io_uring_available() -> bool {
        io_uring::IoUring::new(2).is_ok()
    }

    #[test]
    fn test_single_worker_copies_everything() {
        if !io_uring_available() {
            eprintln!("skipping: io_uring unavailable in this environment");
            return;
        }
        let mut src = NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
        src.write_all(&payload).unwrap();
        src.flush().unwrap();
        let dst = NamedTempFile::new().unwrap();

        let src_file = std::fs::File::open(src.path()).unwrap();
        let dst_file = std::fs::OpenOptions::new()
            .write(true)
            .open(dst.path())
            .unwrap();

        let pump = CopyPump::new(&src_file, &dst_file, 8192, 4096, 512);
        let ring = SlotRing::new().unwrap();
        let slot = IoSlot::new(4096, 512).unwrap();

        Worker::new(0, &pump, ring, slot).run();

        assert!(pump.is_finished());
        assert!(!pump.errored());
        assert_eq!(pump.bytes_read(), 8192);
        assert_eq!(pump.bytes_written(), 8192);
        assert_eq!(std::fs::read(dst.path()).unwrap(), payload);
    }

    #[test]
    fn test_worker_drains_on_write_failure() {
        if !io_uring_available() {
            eprintln!("skipping: io_uring unavailable in this environment");
            return;
        }
        let mut src = NamedTempFile::new().unwrap();
        src.write_all(&[7u8; 4096]).unwrap();
        src.flush().unwrap();
        let dst = NamedTempFile::new().unwrap();

        let src_file = std::fs::File::open(src.path()).unwrap();
        // Read-only destination handle: every write completes with -EBADF.
        let dst_file = std::fs::File::open(dst.path()).unwrap();

        let pump = CopyPump::new(&src_file, &dst_file, 4096, 4096, 512);
        let ring = SlotRing::new().unwrap();
        let slot = IoSlot::new(4096, 512).unwrap();

        Worker::new(0, &pump, ring, slot).run();

        assert!(pump.errored());
        assert_eq!(pump.pending(), 0);
        assert!(matches!(pump.take_error(), Some(Error::Write { .. })));
    }
}
