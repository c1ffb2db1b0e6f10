use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct BatchStats {
    pub start_time: Instant,
    pub total: u64,
    pub completed: Arc<AtomicU64>,
    pub failed: Arc<AtomicU64>,
    pub last_completed: Arc<AtomicU64>,
    pub last_stats_time: Arc<Mutex<Instant>>,
}

impl BatchStats {
    pub fn new(total: u64) -> Self {
        Self {
            start_time: Instant::now(),
            total,
            completed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            last_completed: Arc::new(AtomicU64::new(0)),
            last_stats_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn record(&self, success: bool) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Tasks per second since the previous call.
    pub fn calculate_throughput(&self) -> f64 {
        let mut last_time = self.last_stats_time.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let duration = now.duration_since(*last_time).as_secs_f64();

        let completed = self.completed();
        let last = self.last_completed.swap(completed, Ordering::SeqCst);
        let diff = completed.saturating_sub(last);

        *last_time = now;

        if duration > 0.0 {
            diff as f64 / duration
        } else {
            0.0
        }
    }

    /// Tasks per second over the whole batch.
    pub fn overall_throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.completed() as f64 / secs
        } else {
            0.0
        }
    }
}
