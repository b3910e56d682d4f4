//! Health check configuration

use serde::Deserialize;

/// Configuration for the `/healthz` / `/readyz` HTTP surface.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Maximum queue depth threshold for the readiness probe.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: u64,
}

const fn default_max_queue_depth() -> u64 {
    10_000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_queue_depth: default_max_queue_depth(),
        }
    }
}
