//! Device size and sector geometry discovery
//!
//! Block devices answer through ioctls (`BLKGETSIZE64` for the byte length,
//! `BLKSSZGET` for the logical sector size that governs direct-I/O
//! alignment). Regular files answer through their metadata; their sector size
//! is reported as unknown, leaving the fallback decision to the caller.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use blockcp_types::{DiskInfo, Error, Result};
use tracing::{debug, warn};

// <linux/fs.h>: _IOR(0x12, 114, size_t) and _IO(0x12, 104)
const BLKGETSIZE64: libc::c_ulong = 0x8008_1272;
const BLKSSZGET: libc::c_ulong = 0x1268;

/// [`DiskInfo`] implementation backed by Linux ioctls and file metadata
#[derive(Debug, Default, Clone, Copy)]
pub struct SysDiskInfo;

impl SysDiskInfo {
    /// Create a new probe
    pub fn new() -> Self {
        Self
    }

    fn byte_len(file: &File, path: &Path) -> Result<u64> {
        if is_block_file(file, path)? {
            let mut size: u64 = 0;
            let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size) };
            if rc == 0 {
                debug!(path = %path.display(), size, "BLKGETSIZE64");
                return Ok(size);
            }
            // Some device nodes reject the ioctl; fall through to fstat.
            warn!(
                path = %path.display(),
                errno = std::io::Error::last_os_error().raw_os_error(),
                "BLKGETSIZE64 failed, falling back to file length"
            );
        }
        let len = file
            .metadata()
            .map_err(|source| Error::Probe {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        debug!(path = %path.display(), len, "file length");
        Ok(len)
    }
}

impl DiskInfo for SysDiskInfo {
    fn source_len(&self, src: &File) -> Result<u64> {
        Self::byte_len(src, Path::new("<source>"))
    }

    fn dest_capacity(&self, dst: &File, path: &Path) -> Result<u64> {
        Self::byte_len(dst, path)
    }

    fn sector_size(&self, dst: &File, path: &Path) -> Result<u32> {
        if !is_block_file(dst, path)? {
            debug!(path = %path.display(), "not a block device, sector size unknown");
            return Ok(0);
        }
        let mut sector: libc::c_int = 0;
        let rc = unsafe { libc::ioctl(dst.as_raw_fd(), BLKSSZGET, &mut sector) };
        if rc != 0 {
            warn!(
                path = %path.display(),
                errno = std::io::Error::last_os_error().raw_os_error(),
                "BLKSSZGET failed, sector size unknown"
            );
            return Ok(0);
        }
        debug!(path = %path.display(), sector, "BLKSSZGET");
        Ok(sector as u32)
    }
}

fn is_block_file(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::FileTypeExt;
    let meta = file.metadata().map_err(|source| Error::Probe {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(meta.file_type().is_block_device())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_regular_file_length() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 8700]).unwrap();
        tmp.flush().unwrap();

        let info = SysDiskInfo::new();
        let file = tmp.reopen().unwrap();
        assert_eq!(info.source_len(&file).unwrap(), 8700);
        assert_eq!(info.dest_capacity(&file, tmp.path()).unwrap(), 8700);
    }

    #[test]
    fn test_regular_file_sector_size_is_unknown() {
        let tmp = NamedTempFile::new().unwrap();
        let info = SysDiskInfo::new();
        let file = tmp.reopen().unwrap();
        assert_eq!(info.sector_size(&file, tmp.path()).unwrap(), 0);
    }
}
