//! Lock-free render timing shared by all workers of a frame.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of a running or finished render.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderStats {
    /// Seconds since the render started.
    pub elapsed: f64,
    /// Estimated seconds until the render finishes.
    pub remaining: f64,
    pub current_chunk: usize,
    pub total_chunks: usize,
}

/// Chunk-based progress clock.
///
/// Times are stored as nanoseconds since the clock was created, so every field fits in
/// an atomic and workers can update it through a shared reference.
#[derive(Debug)]
pub struct RenderTime {
    epoch: Instant,
    start_ns: AtomicU64,
    estimated_end_ns: AtomicU64,
    stop_ns: AtomicU64,
    running: AtomicBool,
    current_chunk: AtomicUsize,
    total_chunks: AtomicUsize,
}

impl Default for RenderTime {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTime {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            start_ns: AtomicU64::new(0),
            estimated_end_ns: AtomicU64::new(0),
            stop_ns: AtomicU64::new(0),
            running: AtomicBool::new(false),
            current_chunk: AtomicUsize::new(0),
            total_chunks: AtomicUsize::new(0),
        }
    }

    fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    pub fn start(&self, total_chunks: usize) {
        let now = self.now_ns();
        self.total_chunks.store(total_chunks, Ordering::Relaxed);
        self.current_chunk.store(0, Ordering::Relaxed);
        self.start_ns.store(now, Ordering::Relaxed);
        self.estimated_end_ns.store(now, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.stop_ns.store(self.now_ns(), Ordering::Relaxed);
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Record progress and re-estimate the end time. Counts beyond the total are ignored,
    /// and the count never moves backwards when workers report out of order.
    pub fn update(&self, current_chunk: usize) {
        let total = self.total_chunks.load(Ordering::Relaxed);
        if current_chunk <= total {
            self.current_chunk.fetch_max(current_chunk, Ordering::Relaxed);
        }
        if !self.is_running() || total == 0 {
            return;
        }

        let current = self.current_chunk.load(Ordering::Relaxed);
        let progress = current as f64 / total as f64;
        if progress > 0.0 {
            let start = self.start_ns.load(Ordering::Relaxed);
            let elapsed = self.now_ns().saturating_sub(start) as f64;
            let estimated_total = elapsed / progress;
            self.estimated_end_ns
                .store(start + estimated_total as u64, Ordering::Relaxed);
        }
    }

    pub fn elapsed(&self) -> Duration {
        let start = self.start_ns.load(Ordering::Relaxed);
        let end = if self.is_running() {
            self.now_ns()
        } else {
            self.stop_ns.load(Ordering::Relaxed).max(start)
        };
        Duration::from_nanos(end.saturating_sub(start))
    }

    pub fn stats(&self) -> RenderStats {
        let remaining = if self.is_running() {
            let end = self.estimated_end_ns.load(Ordering::Relaxed);
            Duration::from_nanos(end.saturating_sub(self.now_ns())).as_secs_f64()
        } else {
            0.0
        };
        RenderStats {
            elapsed: self.elapsed().as_secs_f64(),
            remaining,
            current_chunk: self.current_chunk.load(Ordering::Relaxed),
            total_chunks: self.total_chunks.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tracks_chunks() {
        let time = RenderTime::new();
        time.start(10);
        time.update(4);
        let stats = time.stats();
        assert_eq!(stats.current_chunk, 4);
        assert_eq!(stats.total_chunks, 10);
        assert!(stats.remaining >= 0.0);

        // beyond the total is ignored
        time.update(11);
        assert_eq!(time.stats().current_chunk, 4);
    }

    #[test]
    fn test_late_smaller_update_keeps_progress() {
        let time = RenderTime::new();
        time.start(100);
        time.update(40);
        time.update(30);
        assert_eq!(time.stats().current_chunk, 40);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let time = &time;
                scope.spawn(move || {
                    for i in (worker..100).step_by(4).rev() {
                        time.update(i + 1);
                    }
                });
            }
        });
        assert_eq!(time.stats().current_chunk, 100);

        // a new frame starts from zero again
        time.start(10);
        assert_eq!(time.stats().current_chunk, 0);
    }

    #[test]
    fn test_estimate_shrinks_to_zero_when_done() {
        let time = RenderTime::new();
        time.start(4);
        std::thread::sleep(Duration::from_millis(5));
        time.update(4);
        // estimated end is now, so nothing remains
        assert!(time.stats().remaining < 0.005);
    }

    #[test]
    fn test_stop_freezes_elapsed() {
        let time = RenderTime::new();
        time.start(1);
        std::thread::sleep(Duration::from_millis(2));
        time.stop();
        let first = time.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(time.elapsed(), first);
        assert!(first >= Duration::from_millis(2));
        assert_eq!(time.stats().remaining, 0.0);
    }
}
