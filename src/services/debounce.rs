//! Last-write-wins debouncing.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Runs only the most recent submission once `delay` has passed without a
/// newer one. A newer submission cancels the pending one.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Why a debounced call produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Superseded by a newer input")]
pub struct Superseded;

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `job`. Resolves with its output, or `Superseded` if another
    /// call replaced it before the delay elapsed.
    pub async fn run<F, T>(&self, job: F) -> Result<T, Superseded>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(job.await);
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        rx.await.map_err(|_| Superseded)
    }

    /// Drop whatever is pending.
    pub fn cancel(&self) {
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}
