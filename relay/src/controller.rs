//! Top-level process wiring: assembles every crate's pieces behind one
//! shared shutdown broadcast (spawn everything, race it against a signal
//! handler).

use std::sync::{Arc, LazyLock};

use relay_common::Signal;
use relay_delivery::{
    worker, ChannelRegistry, CircuitBreaker, DelayWheel, PriorityQueue, RateLimiter, WorkerContext,
};
use relay_health::HealthChecker;
use relay_store::{DeliveryStore, InMemoryStore};
use relay_templates::TemplateService;
use tokio::sync::broadcast;

use crate::config::Config;

const QUEUE_DEPTH_REPORT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn wait_for_termination() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
        _ = terminate.recv() => {
            tracing::info!("terminate signal received, shutting down");
        }
    }

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();
    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| anyhow::anyhow!("failed to broadcast shutdown: {e}"))?;

    loop {
        tokio::select! {
            signal = receiver.recv() => {
                match signal {
                    Ok(s) => tracing::debug!("received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("received: {e:?}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Periodically mirrors the priority queue's depth into the health checker
/// so `/readyz`'s queue-depth gate reflects real backlog rather than the
/// zero it's initialized with.
async fn report_queue_depth(
    queue: Arc<PriorityQueue>,
    health_checker: Arc<HealthChecker>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let mut ticker = tokio::time::interval(QUEUE_DEPTH_REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let depth = u64::try_from(queue.depth()).unwrap_or(u64::MAX);
                health_checker.set_queue_depth(depth);
            }
            signal = shutdown.recv() => {
                if let Ok(Signal::Shutdown) = signal {
                    tracing::debug!("queue depth reporter shutting down");
                }
                return;
            }
        }
    }
}

/// Owns every long-running task in the process and runs them concurrently
/// until a shutdown signal arrives.
pub struct Relay {
    config: Config,
}

impl Relay {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wire up the store, worker pool, scheduler, and HTTP surface, and run
    /// them until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics initialization, the worker pool, the
    /// scheduler, or the HTTP server fail to start.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("relay starting");

        if let Err(error) = relay_metrics::init_metrics(&self.config.metrics()) {
            tracing::warn!(%error, "metrics initialization failed; continuing without export");
        }

        let store: Arc<dyn DeliveryStore> =
            Arc::new(InMemoryStore::new(Some(self.config.store_capacity)));
        let queue = Arc::new(PriorityQueue::new());
        let delay_wheel = Arc::new(DelayWheel::new());
        let templates = Arc::new(TemplateService::new(store.clone()));
        let channels = Arc::new(ChannelRegistry::new(self.config.channels()));
        let circuit_breaker = Arc::new(CircuitBreaker::new(self.config.circuit_breaker()));
        let rate_limiter = self.config.rate_limit().map(|cfg| Arc::new(RateLimiter::new(cfg)));

        let health_checker = Arc::new(HealthChecker::new(self.config.health().max_queue_depth));
        health_checker.set_store_ready(true);

        let worker_ctx = Arc::new(WorkerContext {
            store: store.clone(),
            templates: templates.clone(),
            channels,
            circuit_breaker,
            rate_limiter,
            queue: queue.clone(),
            delay_wheel: delay_wheel.clone(),
        });

        let scheduler_ctx = Arc::new(relay_scheduler::SchedulerContext {
            store: store.clone(),
            queue: queue.clone(),
        });

        let api_state = Arc::new(relay_api::AppState::new(store, queue.clone(), templates));
        let router = relay_api::router(api_state, health_checker.clone());
        health_checker.set_scheduler_ready(true);

        let worker_handles: Vec<_> = (0..self.config.queue_workers)
            .map(|id| {
                tokio::spawn(worker::run(
                    worker_ctx.clone(),
                    id,
                    SHUTDOWN_BROADCAST.subscribe(),
                ))
            })
            .collect();

        let http_bind_addr = self.config.http_bind_addr.clone();
        let scheduler_poll_interval =
            std::time::Duration::from_millis(self.config.scheduler().poll_interval_ms);

        let result = tokio::select! {
            r = relay_api::serve(router, &http_bind_addr, SHUTDOWN_BROADCAST.subscribe()) => {
                r.map_err(Into::into)
            }
            () = relay_scheduler::run(scheduler_ctx, scheduler_poll_interval, SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = delay_wheel.run(&queue, SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = report_queue_depth(queue.clone(), health_checker.clone(), SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            r = wait_for_termination() => {
                r
            }
        };

        for handle in worker_handles {
            let _ = handle.await;
        }

        tracing::info!("relay stopped");
        result
    }
}
