//! Opening devices for the copy pipeline
//!
//! The source is opened read-only and the destination write-only. With
//! `direct` set, both are opened with `O_DIRECT` to bypass the page cache,
//! which obliges every transfer to use sector-aligned buffers, offsets, and
//! lengths. A block-device destination is additionally opened with `O_EXCL`
//! so the kernel refuses the open while the device is mounted or held by
//! another exclusive opener.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

use blockcp_types::{Error, Result};
use tracing::debug;

/// Open the source device or file read-only
pub fn open_source(path: &Path, direct: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    if direct {
        options.custom_flags(libc::O_DIRECT);
    }
    let file = options.open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), direct, "opened source");
    Ok(file)
}

/// Open the destination device or file write-only, refusing concurrent writers
/// on block devices
pub fn open_destination(path: &Path, direct: bool) -> Result<File> {
    let mut flags = 0;
    if direct {
        flags |= libc::O_DIRECT;
    }
    if is_block_device(path) {
        flags |= libc::O_EXCL;
    }
    let file = OpenOptions::new()
        .write(true)
        .custom_flags(flags)
        .open(path)
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), direct, exclusive = flags & libc::O_EXCL != 0, "opened destination");
    Ok(file)
}

pub(crate) fn is_block_device(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.file_type().is_block_device())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_source_regular_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"hello").unwrap();
        let file = open_source(tmp.path(), false).unwrap();
        assert_eq!(file.metadata().unwrap().len(), 5);
    }

    #[test]
    fn test_open_destination_regular_file() {
        let tmp = NamedTempFile::new().unwrap();
        let file = open_destination(tmp.path(), false).unwrap();
        assert!(file.metadata().is_ok());
    }

    #[test]
    fn test_open_missing_source_fails() {
        let err = open_source(Path::new("/nonexistent/blockcp-src"), false).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn test_regular_file_is_not_block_device() {
        let tmp = NamedTempFile::new().unwrap();
        assert!(!is_block_device(tmp.path()));
    }
}
