//! Tracked background jobs.
//!
//! Jobs outlive the request that started them but not the process: the
//! shutdown coordinator waits for them before exiting. A job that fails or
//! panics is logged and forgotten.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::task::TaskTracker;

use crate::observability::metrics;

#[derive(Debug, Clone, Default)]
pub struct BackgroundJobs {
    tracker: TaskTracker,
    pending: Arc<AtomicUsize>,
}

/// Decrements the pending count however the job ends.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let remaining = self.0.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_background_jobs(remaining);
    }
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` in the background. The pending count is raised before
    /// this returns.
    pub fn spawn<F, E>(&self, name: &'static str, job: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let now_pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_background_jobs(now_pending);
        let guard = PendingGuard(Arc::clone(&self.pending));

        self.tracker.spawn(async move {
            let _guard = guard;
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(())) => tracing::debug!(job = name, "Background job finished"),
                Ok(Err(e)) => tracing::error!(job = name, error = %e, "Background job failed"),
                Err(panic) => tracing::error!(
                    job = name,
                    panic = %panic_message(panic.as_ref()),
                    "Background job panicked"
                ),
            }
        });
    }

    /// Jobs started and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait up to `limit` for every job to finish. Jobs may still be
    /// spawned while waiting; they are waited for too.
    pub async fn wait(&self, limit: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(limit, self.tracker.wait()).await.is_ok()
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_until_done() {
        let jobs = BackgroundJobs::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        jobs.spawn("wait", async move {
            let _ = rx.await;
            Ok::<_, String>(())
        });
        assert_eq!(jobs.pending(), 1);

        tx.send(()).unwrap();
        assert!(jobs.wait(Duration::from_secs(1)).await);
        assert_eq!(jobs.pending(), 0);
    }

    async fn explode() -> Result<(), String> {
        panic!("job exploded")
    }

    #[tokio::test]
    async fn failures_and_panics_are_contained() {
        let jobs = BackgroundJobs::new();
        jobs.spawn("fails", async { Err::<(), _>("boom") });
        jobs.spawn("panics", explode());
        jobs.spawn("ok", async { Ok::<(), String>(()) });

        assert!(jobs.wait(Duration::from_secs(1)).await);
        assert_eq!(jobs.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_after_limit() {
        let jobs = BackgroundJobs::new();
        jobs.spawn("slow", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), String>(())
        });
        assert!(!jobs.wait(Duration::from_secs(1)).await);
        assert_eq!(jobs.pending(), 1);
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
