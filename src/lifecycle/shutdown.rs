//! Shutdown coordination.
//!
//! The coordinator owns the cancellation token handed to the listener, the
//! rate limiter sweep and the signal task. Once it fires, the listener stops
//! accepting and in-flight connections drain; then tracked background jobs
//! get whatever is left of the grace period.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::BackgroundJobs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    SignalReceived,
    Draining,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("connections did not drain within {0:?}")]
    DrainTimeout(Duration),

    #[error("{pending} background jobs still running after {grace:?}")]
    BackgroundJobsTimeout { pending: usize, grace: Duration },

    #[error("listener failed: {0}")]
    Listener(#[from] std::io::Error),
}

pub struct ShutdownCoordinator {
    token: CancellationToken,
    phase: watch::Sender<Phase>,
    grace: Duration,
    jobs: BackgroundJobs,
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration, jobs: BackgroundJobs) -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        Self {
            token: CancellationToken::new(),
            phase,
            grace,
            jobs,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn jobs(&self) -> &BackgroundJobs {
        &self.jobs
    }

    /// Start shutdown, as if a signal had arrived.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
        tracing::debug!(?phase, "Shutdown phase changed");
    }

    /// Drive `server` until shutdown completes.
    ///
    /// `server` must stop accepting once the token is cancelled and resolve
    /// when its connections have drained.
    pub async fn run<F>(&self, server: F) -> Result<(), ShutdownError>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                // Exited without being asked to: fatal unless a cancel raced it.
                result?;
                if !self.token.is_cancelled() {
                    return Err(ShutdownError::Listener(std::io::Error::other(
                        "listener stopped unexpectedly",
                    )));
                }
                self.set_phase(Phase::SignalReceived);
                self.set_phase(Phase::Draining);
                return self.finish(Instant::now()).await;
            }
            _ = self.token.cancelled() => {}
        }

        let started = Instant::now();
        self.set_phase(Phase::SignalReceived);
        tracing::info!(grace = ?self.grace, "Shutting down");

        self.set_phase(Phase::Draining);
        match tokio::time::timeout(self.grace, &mut server).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(grace = ?self.grace, "Connections did not drain in time");
                return Err(ShutdownError::DrainTimeout(self.grace));
            }
        }
        tracing::info!("Listener stopped");

        self.finish(started).await
    }

    async fn finish(&self, started: Instant) -> Result<(), ShutdownError> {
        let remaining = self.grace.saturating_sub(started.elapsed());
        let pending = self.jobs.pending();
        if pending > 0 {
            tracing::info!(pending, "Waiting for background jobs");
        }
        if !self.jobs.wait(remaining).await {
            let pending = self.jobs.pending();
            tracing::error!(pending, "Background jobs did not finish in time");
            return Err(ShutdownError::BackgroundJobsTimeout {
                pending,
                grace: self.grace,
            });
        }

        self.set_phase(Phase::Stopped);
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
