//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, environment name).
    pub listener: ListenerConfig,

    /// Storage operation settings.
    pub storage: StorageConfig,

    /// Per-client admission control.
    pub rate_limit: RateLimitConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Token lifetimes.
    pub tokens: TokenConfig,

    /// Outbound mail settings.
    pub mailer: MailerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Request timeouts.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// Environment name reported by the healthcheck
    /// (development, staging, production).
    pub environment: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Upper bound for every single storage operation, in milliseconds.
    pub query_timeout_ms: u64,
}

impl StorageConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 3_000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting. When disabled the admission layer is not installed.
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst_size: u32,

    /// How often idle clients are swept from the registry, in seconds.
    pub sweep_interval_secs: u64,

    /// A client idle for longer than `sweep_interval * stale_multiplier` is evicted.
    pub stale_multiplier: u32,
}

impl RateLimitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        self.sweep_interval() * self.stale_multiplier
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst_size: 4,
            sweep_interval_secs: 60,
            stale_multiplier: 3,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound for draining connections and background jobs, in seconds.
    pub grace_period_secs: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
        }
    }
}

/// Longest token lifetime accepted by validation (ten years), in hours.
pub const MAX_TOKEN_TTL_HOURS: i64 = 10 * 365 * 24;

/// Token lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime of an authentication token, in hours.
    pub authentication_ttl_hours: i64,

    /// Lifetime of an activation token, in hours.
    pub activation_ttl_hours: i64,
}

impl TokenConfig {
    pub fn authentication_ttl(&self) -> chrono::TimeDelta {
        ttl_from_hours(self.authentication_ttl_hours)
    }

    pub fn activation_ttl(&self) -> chrono::TimeDelta {
        ttl_from_hours(self.activation_ttl_hours)
    }
}

/// Saturates instead of panicking on lifetimes chrono cannot represent.
fn ttl_from_hours(hours: i64) -> chrono::TimeDelta {
    chrono::TimeDelta::try_hours(hours).unwrap_or(chrono::TimeDelta::MAX)
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            authentication_ttl_hours: 24,
            activation_ttl_hours: 72,
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Sender mailbox, e.g. "Greenlight <no-reply@greenlight.local>".
    pub sender: String,

    /// Delivery attempts before giving up.
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            sender: "Greenlight <no-reply@greenlight.local>".to_string(),
            max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 2_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}
