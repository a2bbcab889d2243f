//! Outbound email.
//!
//! Delivery goes through the [`Mailer`] trait. The bundled [`LogMailer`]
//! records each message through tracing instead of speaking SMTP.
//! [`send_with_retry`] wraps any mailer with bounded, backed-off retries.

pub mod templates;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::MailerConfig;
use crate::resilience::backoff::calculate_backoff;

pub use templates::WelcomeEmail;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<MailError> },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Mailer that logs instead of delivering.
#[derive(Debug)]
pub struct LogMailer {
    sender: String,
    delivered: AtomicU64,
}

impl LogMailer {
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            sender: config.sender.clone(),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if !email.to.contains('@') {
            return Err(MailError::InvalidRecipient(email.to.clone()));
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            from = %self.sender,
            to = %email.to,
            subject = %email.subject,
            "Email delivered"
        );
        Ok(())
    }
}

/// Retry policy for [`send_with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl From<&MailerConfig> for RetryPolicy {
    fn from(config: &MailerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

/// Send `email`, retrying failed attempts with exponential backoff.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    email: &Email,
    policy: RetryPolicy,
) -> Result<(), MailError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match mailer.send(email).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(MailError::Exhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let delay = calculate_backoff(
                    attempt,
                    policy.base_delay.as_millis() as u64,
                    policy.max_delay.as_millis() as u64,
                );
                tracing::warn!(to = %email.to, attempt, delay = ?delay, error = %e, "Email delivery failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    /// Fails the first `failures` sends.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Mailer for Flaky {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(MailError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn email() -> Email {
        Email {
            to: "alice@example.com".into(),
            subject: "hi".into(),
            plain_body: "hi".into(),
            html_body: "<p>hi</p>".into(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(2000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let mailer = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        send_with_retry(&mailer, &email(), policy()).await.unwrap();
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mailer = Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let err = send_with_retry(&mailer, &email(), policy()).await.unwrap_err();
        assert!(matches!(err, MailError::Exhausted { attempts: 3, .. }));
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn log_mailer_counts_deliveries() {
        let mailer = LogMailer::new(&MailerConfig::default());
        mailer.send(&email()).await.unwrap();
        assert_eq!(mailer.delivered(), 1);

        let mut bad = email();
        bad.to = "nobody".into();
        assert!(matches!(
            mailer.send(&bad).await,
            Err(MailError::InvalidRecipient(_))
        ));
    }
}
