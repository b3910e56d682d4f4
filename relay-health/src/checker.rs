//! Health check logic

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// Health checker that tracks system component status.
///
/// Thread-safe readiness tracking for the delivery store, the scheduler
/// loop, and the priority queue depth.
#[derive(Debug)]
pub struct HealthChecker {
    /// Whether the delivery store answered its most recent probe.
    store_ready: Arc<AtomicBool>,

    /// Whether the scheduler loop is running.
    scheduler_ready: Arc<AtomicBool>,

    /// Current queue depth (number of pending notifications).
    queue_depth: Arc<AtomicU64>,

    /// Maximum queue depth threshold for readiness.
    max_queue_depth: u64,
}

impl HealthChecker {
    #[must_use]
    pub fn new(max_queue_depth: u64) -> Self {
        Self {
            store_ready: Arc::new(AtomicBool::new(false)),
            scheduler_ready: Arc::new(AtomicBool::new(false)),
            queue_depth: Arc::new(AtomicU64::new(0)),
            max_queue_depth,
        }
    }

    pub fn set_store_ready(&self, ready: bool) {
        self.store_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "store readiness updated");
    }

    pub fn set_scheduler_ready(&self, ready: bool) {
        self.scheduler_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "scheduler readiness updated");
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Liveness: if the HTTP server can respond at all, the process is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        true
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        let store_ok = self.store_ready.load(Ordering::Relaxed);
        let scheduler_ok = self.scheduler_ready.load(Ordering::Relaxed);
        let depth = self.queue_depth.load(Ordering::Relaxed);
        let depth_ok = depth < self.max_queue_depth;

        let ready = store_ok && scheduler_ok && depth_ok;
        if !ready {
            tracing::debug!(
                store_ready = store_ok,
                scheduler_ready = scheduler_ok,
                queue_depth = depth,
                max_queue_depth = self.max_queue_depth,
                "readiness check failed"
            );
        }
        ready
    }

    #[must_use]
    pub fn get_status(&self) -> HealthStatus {
        HealthStatus {
            alive: self.is_alive(),
            ready: self.is_ready(),
            store_ready: self.store_ready.load(Ordering::Relaxed),
            scheduler_ready: self.scheduler_ready.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth,
        }
    }
}

/// Detailed health status information, returned as the `/readyz` body.
#[derive(Debug, Clone, serde::Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Status struct intentionally has multiple boolean fields for clarity"
)]
pub struct HealthStatus {
    pub alive: bool,
    pub ready: bool,
    pub store_ready: bool,
    pub scheduler_ready: bool,
    pub queue_depth: u64,
    pub max_queue_depth: u64,
}
