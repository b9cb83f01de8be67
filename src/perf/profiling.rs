/// Instrumentation for the setup and raster paths
/// Counters only move when the `profiling` feature is enabled
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe call counters for primitive setup and the hardware paths
pub struct RasterCounters {
    // Setup counters
    pub triangles_setup: AtomicU64,
    pub lines_setup: AtomicU64,
    pub points_setup: AtomicU64,
    pub primitives_culled: AtomicU64,
    pub primitives_degenerate: AtomicU64,

    // Scan conversion counters
    pub span_flushes: AtomicU64,
    pub quads_emitted: AtomicU64,

    // Hardware path counters
    pub model_tiles: AtomicU64,
    pub model_half_cycles: AtomicU64,
    pub quads_transferred: AtomicU64,
}

impl RasterCounters {
    pub const fn new() -> Self {
        Self {
            triangles_setup: AtomicU64::new(0),
            lines_setup: AtomicU64::new(0),
            points_setup: AtomicU64::new(0),
            primitives_culled: AtomicU64::new(0),
            primitives_degenerate: AtomicU64::new(0),
            span_flushes: AtomicU64::new(0),
            quads_emitted: AtomicU64::new(0),
            model_tiles: AtomicU64::new(0),
            model_half_cycles: AtomicU64::new(0),
            quads_transferred: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn all(&self) -> [&AtomicU64; 10] {
        [
            &self.triangles_setup,
            &self.lines_setup,
            &self.points_setup,
            &self.primitives_culled,
            &self.primitives_degenerate,
            &self.span_flushes,
            &self.quads_emitted,
            &self.model_tiles,
            &self.model_half_cycles,
            &self.quads_transferred,
        ]
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            triangles_setup: self.triangles_setup.load(Ordering::Relaxed),
            lines_setup: self.lines_setup.load(Ordering::Relaxed),
            points_setup: self.points_setup.load(Ordering::Relaxed),
            primitives_culled: self.primitives_culled.load(Ordering::Relaxed),
            primitives_degenerate: self.primitives_degenerate.load(Ordering::Relaxed),
            span_flushes: self.span_flushes.load(Ordering::Relaxed),
            quads_emitted: self.quads_emitted.load(Ordering::Relaxed),
            model_tiles: self.model_tiles.load(Ordering::Relaxed),
            model_half_cycles: self.model_half_cycles.load(Ordering::Relaxed),
            quads_transferred: self.quads_transferred.load(Ordering::Relaxed),
        }
    }
}

impl Default for RasterCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub triangles_setup: u64,
    pub lines_setup: u64,
    pub points_setup: u64,
    pub primitives_culled: u64,
    pub primitives_degenerate: u64,
    pub span_flushes: u64,
    pub quads_emitted: u64,
    pub model_tiles: u64,
    pub model_half_cycles: u64,
    pub quads_transferred: u64,
}

impl CounterSnapshot {
    /// Print formatted report
    pub fn print_report(&self) {
        println!("\n=== Raster Counters Report ===");
        println!("\nPrimitive Setup:");
        println!("  triangles set up:           {:12}", self.triangles_setup);
        println!("  lines set up:               {:12}", self.lines_setup);
        println!("  points set up:              {:12}", self.points_setup);
        println!("  primitives culled:          {:12}", self.primitives_culled);
        println!("  primitives degenerate:      {:12}", self.primitives_degenerate);

        println!("\nScan Conversion:");
        println!("  span flushes:               {:12}", self.span_flushes);
        println!("  quads emitted:              {:12}", self.quads_emitted);
        if self.span_flushes > 0 {
            let per_flush = self.quads_emitted as f64 / self.span_flushes as f64;
            println!("  quads per flush:            {:12.2}", per_flush);
        }

        println!("\nHardware Paths:");
        println!("  model tiles:                {:12}", self.model_tiles);
        println!("  model half cycles:          {:12}", self.model_half_cycles);
        println!("  quads transferred:          {:12}", self.quads_transferred);

        println!();
    }
}

/// Global raster counters instance
pub static RASTER_COUNTERS: RasterCounters = RasterCounters::new();

/// Increment a field of `RASTER_COUNTERS` (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:ident) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::RASTER_COUNTERS
                .$counter
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a field of `RASTER_COUNTERS` (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:ident, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::RASTER_COUNTERS
                .$counter
                .fetch_add(($value) as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_counters_snapshot_and_reset() {
        let counters = RasterCounters::new();
        counters.quads_emitted.fetch_add(7, Ordering::Relaxed);
        counters.span_flushes.fetch_add(2, Ordering::Relaxed);

        let snap = counters.snapshot();
        assert_eq!(snap.quads_emitted, 7);
        assert_eq!(snap.span_flushes, 2);

        counters.reset();
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }
}
