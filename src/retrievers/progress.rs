//! Progress reporting and cooperative cancellation for retrievals.
//!
//! Components
//! -----------------
//! * [`ProgressSink`] – receives the expected record count and one increment per
//!   consumed record or line.
//! * [`NoProgress`] / [`CountingProgress`] – silent and counting sinks.
//! * [`ProgressBarSink`] – terminal progress bar (feature `progress`).
//! * [`CancelFlag`] – shared flag polled by the retrievers at each record and page
//!   boundary.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receiver of progress notifications.
pub trait ProgressSink {
    /// Announce the number of records expected, when known.
    fn set_total(&self, _total: usize) {}

    fn increment(&self, n: usize);

    /// Called once the retrieval is over, cancelled or not.
    fn finish(&self) {}
}

/// Sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn increment(&self, _n: usize) {}
}

/// Sink that only counts.
#[derive(Debug, Default)]
pub struct CountingProgress {
    count: AtomicUsize,
    total: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

impl ProgressSink for CountingProgress {
    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn increment(&self, n: usize) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(usize),
{
    fn increment(&self, n: usize) {
        self(n)
    }
}

/// Shared cancellation request.
///
/// Cloning gives another handle on the same flag, so the caller can keep one handle
/// and hand another one to the worker running the retrieval.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(feature = "progress")]
pub use bar::ProgressBarSink;

#[cfg(feature = "progress")]
mod bar {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};

    use super::ProgressSink;

    /// `indicatif` bar: `{bar} {pos}/{len} ({percent}%) | {per_sec} | ETA | {msg}`.
    pub struct ProgressBarSink {
        pb: ProgressBar,
    }

    impl ProgressBarSink {
        pub fn new(message: &str) -> Self {
            let pb = ProgressBar::new(1);
            let style = ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(200));
            Self { pb }
        }
    }

    impl ProgressSink for ProgressBarSink {
        fn set_total(&self, total: usize) {
            self.pb.set_length(total.max(1) as u64);
        }

        fn increment(&self, n: usize) {
            self.pb.inc(n as u64);
        }

        fn finish(&self) {
            self.pb.disable_steady_tick();
            self.pb.finish_and_clear();
        }
    }
}
