/// Timing and call counters
///
/// `PerfTimer` reports wall time for a scope through `log` at debug level,
/// optionally with the amount of work done inside it. The counters in
/// [`profiling`] only exist with the `profiling` feature.
pub mod profiling;

pub use profiling::{CounterSnapshot, RasterCounters, RASTER_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    label: &'static str,
    start: Instant,
    items: u64,
}

impl PerfTimer {
    #[inline]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
            items: 0,
        }
    }

    /// Record `n` units of work (quads, triangles) done under this timer.
    #[inline]
    pub fn add_items(&mut self, n: usize) {
        self.items += n as u64;
    }

    #[inline]
    pub fn items(&self) -> u64 {
        self.items
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let elapsed = self.elapsed();
        if self.items == 0 {
            log::debug!("[PERF] {}: {}μs", self.label, elapsed.as_micros());
        } else {
            let per_item = elapsed.as_nanos() / self.items as u128;
            log::debug!(
                "[PERF] {}: {} items in {}μs ({}ns each)",
                self.label,
                self.items,
                elapsed.as_micros(),
                per_item
            );
        }
    }
}

/// Time the rest of the enclosing scope.
#[macro_export]
macro_rules! perf_scope {
    ($label:expr) => {
        let _timer = $crate::perf::PerfTimer::new($label);
    };
}
