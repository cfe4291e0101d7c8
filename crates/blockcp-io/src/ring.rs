//! Per-worker submission ring
//!
//! Each worker owns one io_uring instance and never touches anyone else's.
//! Completions are therefore reaped on the thread that submitted the
//! operation, while that thread is parked in [`SlotRing::wait_completion`] -
//! the cooperative-delivery guarantee the slot ownership model depends on.
//!
//! Operations are tagged through `user_data` so the pump can tell a read
//! completion from a write completion; the tag is the ring-level analogue of
//! recovering a typed context from a raw completion key.

use std::io;
use std::os::fd::RawFd;

use io_uring::{opcode, types, IoUring};

/// Tag for read completions
pub(crate) const USER_DATA_READ: u64 = 0x1;
/// Tag for write completions
pub(crate) const USER_DATA_WRITE: u64 = 0x2;

/// A reaped completion: the operation tag and the raw kernel result
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub(crate) user_data: u64,
    /// Negative errno on failure, transferred byte count on success
    pub(crate) result: i32,
}

/// One worker's private io_uring
pub struct SlotRing {
    ring: IoUring,
}

impl std::fmt::Debug for SlotRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotRing")
            .field("entries", &Self::ENTRIES)
            .finish()
    }
}

impl SlotRing {
    // One read or write in flight per slot, plus room for the chained
    // submission queued before the previous entry is reaped.
    const ENTRIES: u32 = 4;

    /// Create a ring sized for a single in-flight chain
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            ring: IoUring::new(Self::ENTRIES)?,
        })
    }

    /// Queue a read of `len` bytes from `fd` at `offset` into `buf`.
    ///
    /// The entry is flushed to the kernel by the next
    /// [`wait_completion`](Self::wait_completion) call.
    ///
    /// Caller guarantees `buf` stays valid and exclusively borrowed until the
    /// read's completion is reaped.
    pub fn push_read(&mut self, fd: RawFd, buf: *mut u8, len: u32, offset: u64) -> io::Result<()> {
        let entry = opcode::Read::new(types::Fd(fd), buf, len)
            .offset(offset)
            .build()
            .user_data(USER_DATA_READ);
        unsafe { self.ring.submission().push(&entry) }
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "submission queue full"))
    }

    /// Queue a write of `len` bytes from `buf` to `fd` at `offset`.
    ///
    /// Caller guarantees `buf` stays valid until the write's completion is
    /// reaped.
    pub fn push_write(
        &mut self,
        fd: RawFd,
        buf: *const u8,
        len: u32,
        offset: u64,
    ) -> io::Result<()> {
        let entry = opcode::Write::new(types::Fd(fd), buf, len)
            .offset(offset)
            .build()
            .user_data(USER_DATA_WRITE);
        unsafe { self.ring.submission().push(&entry) }
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "submission queue full"))
    }

    /// Submit any queued entries and park until one completion is available,
    /// then reap and return it.
    pub fn wait_completion(&mut self) -> io::Result<Completion> {
        loop {
            match self.ring.submit_and_wait(1) {
                Ok(_) => {}
                Err(e) if e.raw_os_error() == Some(libc::EINTR) => continue,
                Err(e) => return Err(e),
            }
            if let Some(cqe) = self.ring.completion().next() {
                return Ok(Completion {
                    user_data: cqe.user_data(),
                    result: cqe.result(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use tempfile::NamedTempFile;

    fn io_uring_available() -> bool {
        IoUring::new(2).is_ok()
    }

    #[test]
    fn test_read_round_trip() {
        if !io_uring_available() {
            eprintln!("skipping: io_uring unavailable in this environment");
            return;
        }
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"ring test payload").unwrap();
        tmp.flush().unwrap();
        let file = tmp.reopen().unwrap();

        let mut ring = SlotRing::new().unwrap();
        let mut buf = vec![0u8; 17];
        ring.push_read(file.as_raw_fd(), buf.as_mut_ptr(), 17, 0)
            .unwrap();
        let completion = ring.wait_completion().unwrap();
        assert_eq!(completion.user_data, USER_DATA_READ);
        assert_eq!(completion.result, 17);
        assert_eq!(&buf, b"ring test payload");
    }

    #[test]
    fn test_write_then_read_back() {
        if !io_uring_available() {
            eprintln!("skipping: io_uring unavailable in this environment");
            return;
        }
        let tmp = NamedTempFile::new().unwrap();
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(tmp.path())
            .unwrap();

        let mut ring = SlotRing::new().unwrap();
        let payload = b"persisted";
        ring.push_write(file.as_raw_fd(), payload.as_ptr(), payload.len() as u32, 0)
            .unwrap();
        let completion = ring.wait_completion().unwrap();
        assert_eq!(completion.user_data, USER_DATA_WRITE);
        assert_eq!(completion.result, payload.len() as i32);
        assert_eq!(std::fs::read(tmp.path()).unwrap(), payload);
    }

    #[test]
    fn test_failed_operation_reports_errno() {
        if !io_uring_available() {
            eprintln!("skipping: io_uring unavailable in this environment");
            return;
        }
        let tmp = NamedTempFile::new().unwrap();
        // Read-only handle: the write must complete with -EBADF.
        let file = std::fs::File::open(tmp.path()).unwrap();

        let mut ring = SlotRing::new().unwrap();
        let payload = [0u8; 8];
        ring.push_write(file.as_raw_fd(), payload.as_ptr(), 8, 0)
            .unwrap();
        let completion = ring.wait_completion().unwrap();
        assert_eq!(completion.user_data, USER_DATA_WRITE);
        assert_eq!(completion.result, -libc::EBADF);
    }
}
