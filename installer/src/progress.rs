//! Progress observers for long-running pipeline steps.
//!
//! Downloads report bytes received and extraction reports entries scanned.
//! Sinks only observe; nothing a sink does can change the outcome of the
//! step it is attached to.

use std::cell::RefCell;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Observer notified as a step makes progress.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink {
    /// A step named `label` is starting with an expected `total` of units.
    ///
    /// The total is an estimate for steps that cannot know it up front.
    fn begin(&self, label: &str, total: u64);

    /// `delta` more units were processed.
    fn advance(&self, delta: u64);

    /// The current step is over, successfully or not.
    fn finish(&self);
}

/// A sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&self, _label: &str, _total: u64) {}

    fn advance(&self, _delta: u64) {}

    fn finish(&self) {}
}

/// A terminal progress bar drawn on stderr.
///
/// The bar hides itself when stderr is not a terminal.
#[derive(Default)]
pub struct BarProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl BarProgress {
    /// Create a sink with no active bar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ProgressSink for BarProgress {
    fn begin(&self, label: &str, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_style(bar_style());
        bar.set_message(label.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = self.bar.replace(Some(bar)) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self, delta: u64) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            // Estimated totals may be exceeded.
            if bar.position().saturating_add(delta) > bar.length().unwrap_or(0) {
                bar.set_length(bar.position().saturating_add(delta));
            }
            bar.inc(delta);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
