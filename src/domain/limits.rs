use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Optional cap on in-flight work; a limit of 0 means unbounded
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyLimit {
    semaphore: Option<Arc<Semaphore>>,
}

impl ConcurrencyLimit {
    pub fn new(max_in_flight: usize) -> Self {
        let semaphore = (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight)));
        Self { semaphore }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Wait for a slot. The returned permit frees it on drop; `None` when unbounded.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.semaphore {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}
