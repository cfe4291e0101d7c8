//! Progress sampling
//!
//! The monitor runs on the controller's thread while the workers copy. It
//! samples the pump's counters on a coarse timer and hands each snapshot to
//! the caller's callback; it returns once the termination predicate holds.

use std::time::Duration;

use blockcp_io::CopyPump;
use blockcp_types::CopyProgress;

/// Samples copy progress on a fixed interval until the copy finishes
#[derive(Debug)]
pub struct ProgressMonitor {
    interval: Duration,
}

impl ProgressMonitor {
    /// Create a monitor sampling every `interval`
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Block until the pump reports finished, invoking `on_progress` once per
    /// interval
    pub fn watch(&self, pump: &CopyPump, on_progress: &mut dyn FnMut(CopyProgress)) {
        while !pump.is_finished() {
            std::thread::sleep(self.interval);
            on_progress(pump.progress());
        }
    }
}
