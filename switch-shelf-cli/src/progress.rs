//! Terminal progress bar for library operations.

use indicatif::{ProgressBar, ProgressStyle};
use switch_shelf_core::ProgressSink;

/// A [`ProgressSink`] drawing a single indicatif bar.
///
/// The bar stays hidden in quiet mode. The total is taken from the first
/// report, so one bar can follow operations of unknown size.
pub(crate) struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::with_template("  {bar:30.cyan/dim} {pos}/{len} {wide_msg}")
                    .expect("static pattern")
                    .progress_chars("=> "),
            );
            pb
        };
        Self { pb }
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, current: usize, total: usize, message: &str) {
        if self.pb.length() != Some(total as u64) {
            self.pb.set_length(total as u64);
        }
        self.pb.set_position(current as u64);
        self.pb.set_message(message.to_string());
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}
