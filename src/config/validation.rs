//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first one.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AppConfig, MAX_TOKEN_TTL_HOURS};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.storage.query_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "storage.query_timeout_ms",
            "must be greater than zero",
        ));
    }

    let limiter = &config.rate_limit;
    if !(limiter.requests_per_second.is_finite() && limiter.requests_per_second > 0.0) {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            "must be a positive number",
        ));
    }
    if limiter.burst_size == 0 {
        errors.push(ValidationError::new(
            "rate_limit.burst_size",
            "must be greater than zero",
        ));
    }
    if limiter.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than zero",
        ));
    }
    if limiter.stale_multiplier == 0 {
        errors.push(ValidationError::new(
            "rate_limit.stale_multiplier",
            "must be greater than zero",
        ));
    }

    if config.tokens.authentication_ttl_hours <= 0 {
        errors.push(ValidationError::new(
            "tokens.authentication_ttl_hours",
            "must be greater than zero",
        ));
    } else if config.tokens.authentication_ttl_hours > MAX_TOKEN_TTL_HOURS {
        errors.push(ValidationError::new(
            "tokens.authentication_ttl_hours",
            format!("must not exceed {MAX_TOKEN_TTL_HOURS} hours"),
        ));
    }
    if config.tokens.activation_ttl_hours <= 0 {
        errors.push(ValidationError::new(
            "tokens.activation_ttl_hours",
            "must be greater than zero",
        ));
    } else if config.tokens.activation_ttl_hours > MAX_TOKEN_TTL_HOURS {
        errors.push(ValidationError::new(
            "tokens.activation_ttl_hours",
            format!("must not exceed {MAX_TOKEN_TTL_HOURS} hours"),
        ));
    }

    if config.mailer.max_attempts == 0 {
        errors.push(ValidationError::new(
            "mailer.max_attempts",
            "must be at least 1",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be greater than zero",
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.rate_limit.requests_per_second = 0.0;
        config.rate_limit.stale_multiplier = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rate_limit.requests_per_second",
                "rate_limit.stale_multiplier",
            ]
        );
    }

    #[test]
    fn token_lifetimes_are_bounded() {
        let mut config = AppConfig::default();
        config.tokens.authentication_ttl_hours = 3_000_000_000_000;
        config.tokens.activation_ttl_hours = MAX_TOKEN_TTL_HOURS;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "tokens.authentication_ttl_hours");

        // Even unvalidated values never panic when turned into durations.
        assert_eq!(config.tokens.authentication_ttl(), chrono::TimeDelta::MAX);
        assert_eq!(
            config.tokens.activation_ttl(),
            chrono::TimeDelta::hours(MAX_TOKEN_TTL_HOURS)
        );
    }
}
