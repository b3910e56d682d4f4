//! Process configuration: a single `Config::from_env()` entry point
//! `main` calls; no other component reads an environment variable
//! directly (the one exception is `relay_common::logging::init`, which
//! runs before `Config` exists and reads `LOG_LEVEL` itself).

use relay_delivery::{
    channels::email::SmtpConfig, CircuitBreakerConfig, ChannelConfig, RateLimitConfig,
};
use relay_health::HealthConfig;
use relay_metrics::MetricsConfig;
use relay_scheduler::SchedulerConfig;
use serde::Deserialize;

/// Flat, environment-overlaid configuration tree. Loaded once via
/// [`Config::from_env`]; every field matches an environment variable name,
/// case-insensitively, via `envy`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::queue_workers")]
    pub queue_workers: usize,

    #[serde(default = "defaults::rate_limit_enabled")]
    pub rate_limit_enabled: bool,
    #[serde(default = "defaults::rate_limit_capacity")]
    pub rate_limit_capacity: f64,
    #[serde(default = "defaults::rate_limit_refill")]
    pub rate_limit_refill: f64,

    #[serde(default = "defaults::cb_failure_threshold")]
    pub cb_failure_threshold: u32,
    #[serde(default = "defaults::cb_cooldown")]
    pub cb_cooldown: u64,

    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,
    #[serde(default = "defaults::smtp_use_tls")]
    pub smtp_use_tls: bool,
    #[serde(default = "defaults::smtp_starttls")]
    pub smtp_starttls: bool,

    #[serde(default = "defaults::add_spf_header")]
    pub add_spf_header: bool,
    #[serde(default = "defaults::add_dkim_header")]
    pub add_dkim_header: bool,
    #[serde(default = "defaults::failure_rate")]
    pub failure_rate: f64,

    #[serde(default = "defaults::http_bind_addr")]
    pub http_bind_addr: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: Option<String>,

    #[serde(default = "defaults::message_expiration_secs")]
    pub message_expiration_secs: u64,
    #[serde(default = "defaults::store_capacity")]
    pub store_capacity: usize,
}

mod defaults {
    pub const fn queue_workers() -> usize {
        4
    }

    pub const fn rate_limit_enabled() -> bool {
        false
    }

    pub const fn rate_limit_capacity() -> f64 {
        10.0
    }

    pub const fn rate_limit_refill() -> f64 {
        1.0
    }

    pub const fn cb_failure_threshold() -> u32 {
        3
    }

    pub const fn cb_cooldown() -> u64 {
        60
    }

    pub const fn smtp_port() -> u16 {
        587
    }

    pub const fn smtp_use_tls() -> bool {
        true
    }

    pub const fn smtp_starttls() -> bool {
        true
    }

    pub const fn add_spf_header() -> bool {
        true
    }

    pub const fn add_dkim_header() -> bool {
        true
    }

    pub const fn failure_rate() -> f64 {
        0.05
    }

    pub fn http_bind_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    pub const fn log_level() -> Option<String> {
        None
    }

    pub const fn message_expiration_secs() -> u64 {
        86_400
    }

    pub const fn store_capacity() -> usize {
        100_000
    }
}

impl Config {
    /// Load configuration from an optional RON file (`RELAY_CONFIG`, falling
    /// back to `./relay.config.ron`), overlaid by environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present config file can't be parsed, or if
    /// environment variables don't deserialize against this struct's types.
    pub fn from_env() -> anyhow::Result<Self> {
        let base: Self = match Self::config_file_path() {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("failed to read config from {}: {e}", path.display())
                })?;
                ron::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?
            }
            None => envy::from_env()?,
        };

        // Environment variables always take precedence over the file, so
        // overlay them even when a file was present.
        let overlaid = envy::from_env::<PartialOverlay>()?.apply(base);
        Ok(overlaid)
    }

    fn config_file_path() -> Option<std::path::PathBuf> {
        if let Ok(path) = std::env::var("RELAY_CONFIG") {
            let path = std::path::PathBuf::from(path);
            return path.exists().then_some(path);
        }
        let default_path = std::path::PathBuf::from("./relay.config.ron");
        default_path.exists().then_some(default_path)
    }

    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limit_enabled.then(|| RateLimitConfig {
            capacity: self.rate_limit_capacity,
            refill_rate: self.rate_limit_refill,
        })
    }

    #[must_use]
    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.cb_failure_threshold,
            cooldown_secs: self.cb_cooldown,
        }
    }

    #[must_use]
    pub fn channels(&self) -> ChannelConfig {
        ChannelConfig {
            failure_rate: self.failure_rate,
            smtp: SmtpConfig {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                username: self.smtp_username.clone(),
                password: self.smtp_password.clone(),
                from: self.smtp_from.clone(),
                use_tls: self.smtp_use_tls,
                use_starttls: self.smtp_starttls,
            },
            add_spf_header: self.add_spf_header,
            add_dkim_header: self.add_dkim_header,
        }
    }

    #[must_use]
    pub fn health(&self) -> HealthConfig {
        HealthConfig::default()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig::default()
    }

    #[must_use]
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig::default()
    }
}

/// Every field optional, used purely to re-apply environment variables on
/// top of a file-sourced [`Config`] so env always wins.
#[derive(Debug, Deserialize, Default)]
struct PartialOverlay {
    queue_workers: Option<usize>,
    rate_limit_enabled: Option<bool>,
    rate_limit_capacity: Option<f64>,
    rate_limit_refill: Option<f64>,
    cb_failure_threshold: Option<u32>,
    cb_cooldown: Option<u64>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_from: Option<String>,
    smtp_use_tls: Option<bool>,
    smtp_starttls: Option<bool>,
    add_spf_header: Option<bool>,
    add_dkim_header: Option<bool>,
    failure_rate: Option<f64>,
    http_bind_addr: Option<String>,
    log_level: Option<String>,
    message_expiration_secs: Option<u64>,
    store_capacity: Option<usize>,
}

impl PartialOverlay {
    fn apply(self, mut base: Config) -> Config {
        macro_rules! overlay {
            ($field:ident) => {
                if let Some(value) = self.$field {
                    base.$field = value;
                }
            };
        }
        overlay!(queue_workers);
        overlay!(rate_limit_enabled);
        overlay!(rate_limit_capacity);
        overlay!(rate_limit_refill);
        overlay!(cb_failure_threshold);
        overlay!(cb_cooldown);
        if self.smtp_host.is_some() {
            base.smtp_host = self.smtp_host;
        }
        overlay!(smtp_port);
        if self.smtp_username.is_some() {
            base.smtp_username = self.smtp_username;
        }
        if self.smtp_password.is_some() {
            base.smtp_password = self.smtp_password;
        }
        if self.smtp_from.is_some() {
            base.smtp_from = self.smtp_from;
        }
        overlay!(smtp_use_tls);
        overlay!(smtp_starttls);
        overlay!(add_spf_header);
        overlay!(add_dkim_header);
        overlay!(failure_rate);
        overlay!(http_bind_addr);
        if self.log_level.is_some() {
            base.log_level = self.log_level;
        }
        overlay!(message_expiration_secs);
        overlay!(store_capacity);
        base
    }
}
