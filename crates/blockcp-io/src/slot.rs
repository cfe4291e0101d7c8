//! Per-worker I/O slot
//!
//! A slot carries the state of one outstanding read-then-write pair: the
//! fixed buffer, the source offset of the operation in flight, the byte
//! counts of the read and the padded write, and the completion flag the pump
//! raises to tell the owning worker the slot is free again.
//!
//! A slot is mutated only by the worker that owns it - including from inside
//! completion handling, which runs on that same thread - so none of these
//! fields need synchronization.

use blockcp_types::Result;

use crate::buffer::AlignedBuf;

/// State for one in-flight read/write pair, owned by exactly one worker
#[derive(Debug)]
pub struct IoSlot {
    pub(crate) buf: AlignedBuf,
    /// Source offset of the operation currently in flight
    pub(crate) offset: u64,
    /// Bytes delivered by the most recent read
    pub(crate) read_bytes: usize,
    /// Bytes submitted for the paired write (read length padded to a sector)
    pub(crate) write_bytes: usize,
    /// Raised by the pump when the slot's chain has finished
    pub(crate) completed: bool,
}

impl IoSlot {
    /// Allocate a slot with a `block_size` buffer aligned to `align` bytes
    pub fn new(block_size: usize, align: usize) -> Result<Self> {
        Ok(Self {
            buf: AlignedBuf::new(block_size, align)?,
            offset: 0,
            read_bytes: 0,
            write_bytes: 0,
            completed: false,
        })
    }

    /// The slot's transfer buffer
    pub fn buffer(&self) -> &AlignedBuf {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_idle() {
        let slot = IoSlot::new(4096, 512).unwrap();
        assert!(!slot.completed);
        assert_eq!(slot.read_bytes, 0);
        assert_eq!(slot.write_bytes, 0);
        assert_eq!(slot.buffer().len(), 4096);
        assert_eq!(slot.buffer().as_ptr() as usize % 512, 0);
    }

    #[test]
    fn test_allocation_failure_is_an_error() {
        assert!(IoSlot::new(0, 512).is_err());
    }
}
