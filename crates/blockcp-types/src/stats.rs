//! Statistics and progress reporting types

use std::time::Duration;

/// Final statistics for a completed copy operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Total bytes read from the source
    pub bytes_read: u64,
    /// Total bytes written to the destination (includes tail padding)
    pub bytes_written: u64,
    /// Wall-clock duration of the copy
    pub duration: Duration,
}

impl CopyStats {
    /// Overall transfer rate in bytes per second, based on bytes read
    pub fn transfer_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_read as f64 / secs
        } else {
            0.0
        }
    }
}

/// Point-in-time progress snapshot sampled by the controller
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyProgress {
    /// Bytes read from the source so far
    pub bytes_read: u64,
    /// Bytes written to the destination so far
    pub bytes_written: u64,
    /// Total source length in bytes
    pub source_len: u64,
    /// Asynchronous operations submitted but not yet completed
    pub pending: u64,
}

impl CopyProgress {
    /// Read progress as a percentage of the source length
    pub fn read_percent(&self) -> f64 {
        if self.source_len > 0 {
            self.bytes_read as f64 * 100.0 / self.source_len as f64
        } else {
            100.0
        }
    }

    /// Write progress as a percentage of the source length
    pub fn write_percent(&self) -> f64 {
        if self.source_len > 0 {
            (self.bytes_written.min(self.source_len)) as f64 * 100.0 / self.source_len as f64
        } else {
            100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_rate() {
        let stats = CopyStats {
            bytes_read: 100 * 1024 * 1024,
            bytes_written: 100 * 1024 * 1024,
            duration: Duration::from_secs(2),
        };
        assert!((stats.transfer_rate() - 50.0 * 1024.0 * 1024.0).abs() < 1.0);
    }

    #[test]
    fn test_zero_duration_rate() {
        let stats = CopyStats::default();
        assert_eq!(stats.transfer_rate(), 0.0);
    }

    #[test]
    fn test_progress_percentages() {
        let progress = CopyProgress {
            bytes_read: 512,
            bytes_written: 256,
            source_len: 1024,
            pending: 2,
        };
        assert!((progress.read_percent() - 50.0).abs() < f64::EPSILON);
        assert!((progress.write_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_source_reports_complete() {
        let progress = CopyProgress::default();
        assert_eq!(progress.read_percent(), 100.0);
        assert_eq!(progress.write_percent(), 100.0);
    }
}
