//! Change feeds for host values (prompt text, resolution).
//!
//! A host either pushes new values into a [`tokio::sync::watch`] channel or
//! only lets us read the current value, in which case it is polled. Both end
//! up as one async stream of distinct values.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Buffer between the watcher task and the consumer.
const FEED_BUFFER: usize = 16;

/// Distinct values from a pushed or polled source.
///
/// The current value is emitted first; afterwards only changes are. The
/// watcher task stops when the feed is dropped.
#[derive(Debug)]
pub struct ChangeFeed<T> {
    rx: mpsc::Receiver<T>,
    handle: JoinHandle<()>,
}

impl<T> ChangeFeed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Feed from a host that pushes values.
    #[must_use]
    pub fn push(mut source: watch::Receiver<T>) -> Self {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let handle = tokio::spawn(async move {
            let mut last = source.borrow_and_update().clone();
            if tx.send(last.clone()).await.is_err() {
                return;
            }
            while source.changed().await.is_ok() {
                let value = source.borrow_and_update().clone();
                if value == last {
                    continue;
                }
                last = value.clone();
                if tx.send(value).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Push feed source closed");
        });
        Self { rx, handle }
    }

    /// Feed from a host that can only be read. `None` readings are ignored.
    #[must_use]
    pub fn poll<F>(interval: Duration, mut read: F) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<T> = None;
            loop {
                ticker.tick().await;
                let Some(value) = read() else {
                    continue;
                };
                if last.as_ref() == Some(&value) {
                    continue;
                }
                last = Some(value.clone());
                if tx.send(value).await.is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    /// Next distinct value, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next value once the source has been quiet for `quiet`.
    ///
    /// Values arriving during the quiet period replace the pending one, so a
    /// burst of edits yields only its last value.
    pub async fn next_settled(&mut self, quiet: Duration) -> Option<T> {
        let mut value = self.rx.recv().await?;
        loop {
            match tokio::time::timeout(quiet, self.rx.recv()).await {
                Ok(Some(newer)) => value = newer,
                Ok(None) | Err(_) => return Some(value),
            }
        }
    }
}

impl<T> Drop for ChangeFeed<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
