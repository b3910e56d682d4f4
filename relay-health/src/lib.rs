//! Health check endpoints for the notification delivery pipeline.
//!
//! # Endpoints
//!
//! - **`/healthz`** - Liveness probe: returns 200 if the process is running.
//! - **`/readyz`** - Readiness probe: returns 200 if the store, scheduler,
//!   and queue depth are all within bounds.
//!
//! # Usage
//!
//! ```rust,no_run
//! use relay_health::{health_router, HealthChecker};
//! use std::sync::Arc;
//!
//! let health_checker = Arc::new(HealthChecker::new(10000));
//! let router = health_router(health_checker);
//! // merge `router` into the rest of the app and serve it from one listener.
//! ```

mod checker;
mod config;
mod server;

pub use checker::{HealthChecker, HealthStatus};
pub use config::HealthConfig;
pub use server::health_router;
