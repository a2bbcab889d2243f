//! Per-client token bucket admission.
//!
//! One bucket per client key, created full on first sight. Every access to
//! the client map (create, refill, consume, stamp, evict) happens under a
//! single mutex with no I/O inside the critical section. Clients idle for
//! longer than `stale_after` are removed by a periodic sweep.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_update {
            self.last_update = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Registry of client buckets.
///
/// Constructed once and shared by the admission middleware and the
/// eviction task.
#[derive(Debug)]
pub struct TokenBucketRegistry {
    clients: Mutex<HashMap<String, ClientEntry>>,
    rate: f64,
    burst: f64,
    stale_after: Duration,
}

impl TokenBucketRegistry {
    pub fn new(rate: f64, burst: u32, stale_after: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            rate,
            burst: f64::from(burst),
            stale_after,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.requests_per_second,
            config.burst_size,
            config.stale_after(),
        )
    }

    /// Consume one token for `key`. Never blocks on an empty bucket.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        let entry = clients
            .entry(key.to_string())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(self.burst, now),
                last_seen: now,
            });
        if now > entry.last_seen {
            entry.last_seen = now;
        }
        entry.bucket.try_acquire(self.burst, self.rate, now)
    }

    /// Remove clients not seen for longer than `stale_after`. Returns how
    /// many were removed.
    pub fn evict_stale(&self) -> usize {
        self.evict_stale_at(Instant::now())
    }

    pub fn evict_stale_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.stale_after);
        before - clients.len()
    }

    pub fn len(&self) -> usize {
        self.clients.lock().expect("rate limiter mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep every `interval` until `cancel` fires.
    pub fn spawn_eviction(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.evict_stale();
                        let remaining = registry.len();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining, "Evicted idle rate limiter clients");
                            metrics::record_limiter_evictions(evicted);
                        }
                        metrics::record_limiter_clients(remaining);
                    }
                }
            }
            tracing::debug!("Rate limiter eviction task stopped");
        })
    }
}

/// Client key: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// peer address.
pub fn client_key(request: &Request<Body>) -> String {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    let peer = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    forwarded
        .or_else(real_ip)
        .or_else(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission middleware. Denied requests never reach the handler.
pub async fn rate_limit_middleware(
    State(registry): State<Arc<TokenBucketRegistry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);

    if registry.admit(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimitExceeded.into_response()
    }
}
