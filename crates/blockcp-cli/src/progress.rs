//! Terminal progress rendering

use std::time::Duration;

use blockcp_types::CopyProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// Byte-level progress bar fed from the controller's progress callback
pub struct CopyProgressBar {
    bar: Option<ProgressBar>,
    sized: bool,
}

impl CopyProgressBar {
    /// Create the bar; `quiet` suppresses all rendering
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            None
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
                    )
                    .expect("static template is valid")
                    .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            Some(bar)
        };
        Self { bar, sized: false }
    }

    /// Render one progress snapshot
    pub fn update(&mut self, progress: &CopyProgress) {
        let Some(bar) = &self.bar else {
            return;
        };
        // The source length is discovered at preflight, after the bar exists.
        if !self.sized {
            bar.set_length(progress.source_len);
            self.sized = true;
        }
        bar.set_position(progress.bytes_read.min(progress.source_len));
        bar.set_message(format!("{} pending", progress.pending));
    }

    /// Stop rendering, leaving the final state visible
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message("flushed");
        }
    }
}
