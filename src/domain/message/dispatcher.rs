use super::error::MessageServiceError;
use crate::domain::limits::ConcurrencyLimit;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

/// Runs processing jobs in the background.
///
/// Every job is tracked so shutdown and tests can drain them, and every
/// failure (error or panic) is logged instead of being lost with the task.
pub struct MessageDispatcher {
    tracker: TaskTracker,
    limit: ConcurrencyLimit,
    draining: Mutex<()>,
}

impl MessageDispatcher {
    pub fn new(limit: ConcurrencyLimit) -> Self {
        Self {
            tracker: TaskTracker::new(),
            limit,
            draining: Mutex::new(()),
        }
    }

    pub fn dispatch<F, T>(&self, message_id: String, job: F)
    where
        F: Future<Output = Result<T, MessageServiceError>> + Send + 'static,
        T: Send + 'static,
    {
        let limit = self.limit.clone();

        self.tracker.spawn(async move {
            let _permit = limit.acquire().await;

            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(MessageServiceError::Superseded(_))) => {
                    tracing::debug!(message_id = %message_id, "Background job superseded");
                }
                Ok(Err(e)) => {
                    tracing::error!(message_id = %message_id, error = %e, "Background job failed");
                }
                Err(_) => {
                    tracing::error!(message_id = %message_id, "Background job panicked");
                }
            }
        });
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every dispatched job to finish. New jobs are still accepted.
    ///
    /// Concurrent callers drain one after the other, so a `reopen` never
    /// lands while another caller is still waiting on the closed tracker.
    pub async fn drain(&self) {
        let _guard = self.draining.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
