//! The copy pump: read issue and completion chaining
//!
//! [`CopyPump`] holds the engine-wide shared state and implements the slot
//! protocol: claim a block, submit the read, and on read completion pad the
//! tail to a sector boundary and chain the write at the same offset. A write
//! completion (or a read that ends the stream) marks the slot completed so
//! the owning worker can claim the next block.
//!
//! Every runtime failure funnels into one error flag plus the first recorded
//! error; once the flag is set, in-flight reads drain without chaining their
//! writes and no further blocks are claimed.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use blockcp_types::{CopyProgress, Error};
use tracing::{debug, error, trace};

use crate::cursor::BlockCursor;
use crate::ring::{Completion, SlotRing, USER_DATA_READ, USER_DATA_WRITE};
use crate::slot::IoSlot;

/// Result of trying to put another read in flight on a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// A read was submitted; a completion will arrive on the worker's ring
    Submitted,
    /// Nothing was submitted: the source is exhausted or the copy has failed
    NoMoreWork,
}

/// Engine-wide shared state and the completion-chaining logic
#[derive(Debug)]
pub struct CopyPump {
    src: RawFd,
    dst: RawFd,
    cursor: BlockCursor,
    block_size: usize,
    sector_size: u32,
    source_len: u64,

    pending: AtomicI64,
    reads_done: AtomicBool,
    errored: AtomicBool,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    first_error: Mutex<Option<Error>>,
}

impl CopyPump {
    /// Create a pump over open source and destination handles.
    ///
    /// The handles must stay open for the pump's lifetime; the controller
    /// keeps them alive until every worker has joined.
    pub fn new(
        src: &File,
        dst: &File,
        source_len: u64,
        block_size: usize,
        sector_size: u32,
    ) -> Self {
        Self {
            src: src.as_raw_fd(),
            dst: dst.as_raw_fd(),
            cursor: BlockCursor::new(block_size, source_len),
            block_size,
            sector_size,
            source_len,
            pending: AtomicI64::new(0),
            reads_done: AtomicBool::new(false),
            errored: AtomicBool::new(false),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            first_error: Mutex::new(None),
        }
    }

    /// Try to put the next read in flight on `slot`.
    ///
    /// Preconditions: the slot has no operation in flight and its completed
    /// flag is clear.
    pub fn issue_read(&self, ring: &mut SlotRing, slot: &mut IoSlot) -> IssueOutcome {
        if self.reads_done() || self.errored() {
            return IssueOutcome::NoMoreWork;
        }
        let Some(claim) = self.cursor.claim() else {
            debug!("source exhausted, no more reads to issue");
            self.reads_done.store(true, Ordering::Release);
            return IssueOutcome::NoMoreWork;
        };

        // Direct I/O requires sector-multiple transfer lengths; the tail block
        // is submitted rounded up and comes back as a short read of the true
        // remainder. Full blocks are unaffected since B is a sector multiple.
        let submit_len = align_up(claim.len, self.sector_size);
        debug_assert!(submit_len <= self.block_size);

        slot.offset = claim.offset;
        slot.read_bytes = 0;
        slot.write_bytes = 0;
        slot.completed = false;
        self.pending.fetch_add(1, Ordering::AcqRel);

        if let Err(source) = ring.push_read(
            self.src,
            slot.buf.as_mut_ptr(),
            submit_len as u32,
            claim.offset,
        ) {
            self.fail(Error::Read {
                offset: claim.offset,
                source,
            });
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return IssueOutcome::NoMoreWork;
        }
        trace!(offset = claim.offset, len = submit_len, "read submitted");
        IssueOutcome::Submitted
    }

    /// Route a reaped completion to the read or write handler
    pub fn dispatch(&self, completion: Completion, ring: &mut SlotRing, slot: &mut IoSlot) {
        match completion.user_data {
            USER_DATA_READ => self.on_read_completion(ring, slot, completion.result),
            USER_DATA_WRITE => self.on_write_completion(slot, completion.result),
            tag => {
                self.fail(Error::Ring {
                    source: io::Error::new(
                        io::ErrorKind::Other,
                        format!("unexpected completion tag {}", tag),
                    ),
                });
                slot.completed = true;
            }
        }
    }

    fn on_read_completion(&self, ring: &mut SlotRing, slot: &mut IoSlot, result: i32) {
        self.pending.fetch_sub(1, Ordering::AcqRel);

        if result < 0 {
            self.fail(Error::Read {
                offset: slot.offset,
                source: io::Error::from_raw_os_error(-result),
            });
            slot.completed = true;
            return;
        }
        if result == 0 {
            debug!(offset = slot.offset, "end of input");
            self.reads_done.store(true, Ordering::Release);
            slot.completed = true;
            return;
        }

        let read_bytes = result as usize;
        slot.read_bytes = read_bytes;
        self.bytes_read.fetch_add(read_bytes as u64, Ordering::Relaxed);
        trace!(offset = slot.offset, read_bytes, "read completed");

        if self.errored() {
            // Drain: the data arrived but the copy is aborting, so the paired
            // write is not issued. The slot is still released.
            slot.completed = true;
            return;
        }

        let write_bytes = align_up(read_bytes, self.sector_size);
        if write_bytes > slot.buf.len() {
            self.fail(Error::config(format!(
                "buffer of {} bytes cannot pad a {} byte read to sector size {}",
                slot.buf.len(),
                read_bytes,
                self.sector_size
            )));
            slot.completed = true;
            return;
        }
        if write_bytes > read_bytes {
            slot.buf.zero_range(read_bytes, write_bytes);
        }
        slot.write_bytes = write_bytes;

        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(source) = ring.push_write(
            self.dst,
            slot.buf.as_ptr(),
            write_bytes as u32,
            slot.offset,
        ) {
            self.fail(Error::Write {
                offset: slot.offset,
                source,
            });
            self.pending.fetch_sub(1, Ordering::AcqRel);
            slot.completed = true;
            return;
        }
        trace!(offset = slot.offset, len = write_bytes, "write submitted");
    }

    fn on_write_completion(&self, slot: &mut IoSlot, result: i32) {
        self.pending.fetch_sub(1, Ordering::AcqRel);

        if result < 0 {
            self.fail(Error::Write {
                offset: slot.offset,
                source: io::Error::from_raw_os_error(-result),
            });
        } else {
            let written = result as usize;
            self.bytes_written.fetch_add(written as u64, Ordering::Relaxed);
            if written < slot.write_bytes {
                self.fail(Error::Write {
                    offset: slot.offset,
                    source: io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", written, slot.write_bytes),
                    ),
                });
            } else {
                trace!(offset = slot.offset, written, "write completed");
            }
        }
        slot.completed = true;
    }

    /// Record an error and flip the abort flag.
    ///
    /// Only the first error is kept; later ones are logged and dropped.
    pub fn fail(&self, err: Error) {
        error!(error = %err, "copy aborting");
        let mut first = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if first.is_none() {
            *first = Some(err);
        }
        drop(first);
        self.errored.store(true, Ordering::Release);
    }

    /// True once no further reads will be issued
    pub fn reads_done(&self) -> bool {
        self.reads_done.load(Ordering::Acquire)
    }

    /// True once any failure has been recorded
    pub fn errored(&self) -> bool {
        self.errored.load(Ordering::Acquire)
    }

    /// Operations submitted but not yet completed
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire).max(0) as u64
    }

    /// Total bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Total bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Termination predicate: all reads issued and everything in flight has
    /// landed, or the copy has failed
    pub fn is_finished(&self) -> bool {
        self.errored() || (self.reads_done() && self.pending.load(Ordering::Acquire) == 0)
    }

    /// Snapshot the counters for progress reporting
    pub fn progress(&self) -> CopyProgress {
        CopyProgress {
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            source_len: self.source_len,
            pending: self.pending(),
        }
    }

    /// Take the first recorded error, if any
    pub fn take_error(&self) -> Option<Error> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

fn align_up(len: usize, sector: u32) -> usize {
    let sector = sector as usize;
    len.div_ceil(sector) * sector
}
