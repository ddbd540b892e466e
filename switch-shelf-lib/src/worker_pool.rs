//! Worker pool for concurrent container decoding with backpressure.
//!
//! Spawns N persistent tokio tasks that pull `(index, item)` pairs from a
//! bounded async-channel. Every submitted item produces exactly one
//! [`WorkResult`] tagged with its submission index, so the consumer can put
//! results back into submission order.
//!
//! `async-channel`'s `Receiver` is `Clone`, so each worker owns a handle and
//! no worker can starve the others while blocked on `recv()`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Hard safety-net timeout per work item. A decode that hangs beyond this
/// is abandoned and reported as [`WorkResult::TimedOut`].
pub const SAFETY_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one submitted item.
#[derive(Debug)]
pub enum WorkResult<R> {
    Done(R),
    TimedOut,
    /// The cancel flag was set before the item was started
    Cancelled,
}

/// A pool of worker tasks that process items concurrently.
///
/// ```ignore
/// let mut pool = WorkerPool::start(4, items, None, |item| async move {
///     decode(item).await
/// });
///
/// while let Some((index, result)) = pool.recv().await {
///     handle(index, result);
/// }
/// ```
pub struct WorkerPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<(usize, WorkResult<R>)>,
    _handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn `n` workers (at least one), submit all items, and return a pool
    /// for receiving results.
    ///
    /// Submission runs in a background task with a channel of capacity `n`,
    /// so the caller can start receiving immediately. Once `cancel` is set,
    /// items not yet started are answered with [`WorkResult::Cancelled`].
    pub fn start<W, F, Fut>(
        n: usize,
        items: Vec<W>,
        cancel: Option<Arc<AtomicBool>>,
        process_fn: F,
    ) -> Self
    where
        W: Send + 'static,
        F: Fn(W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let n = n.max(1);
        let (work_tx, work_rx) = async_channel::bounded::<(usize, W)>(n);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<(usize, WorkResult<R>)>();
        let process_fn = Arc::new(process_fn);

        let handles: Vec<JoinHandle<()>> = (0..n)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let process_fn = process_fn.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    while let Ok((index, item)) = work_rx.recv().await {
                        let cancelled = cancel
                            .as_ref()
                            .is_some_and(|c| c.load(Ordering::Relaxed));
                        let result = if cancelled {
                            WorkResult::Cancelled
                        } else {
                            match tokio::time::timeout(SAFETY_TIMEOUT, process_fn(item)).await {
                                Ok(r) => WorkResult::Done(r),
                                Err(_) => {
                                    log::warn!(
                                        "Worker pool: item {} timed out after {}s, skipping",
                                        index,
                                        SAFETY_TIMEOUT.as_secs()
                                    );
                                    WorkResult::TimedOut
                                }
                            }
                        };
                        if result_tx.send((index, result)).is_err() {
                            break; // Receiver dropped
                        }
                    }
                })
            })
            .collect();

        // Channel closes once every worker has finished
        drop(result_tx);

        tokio::spawn(async move {
            for pair in items.into_iter().enumerate() {
                if work_tx.send(pair).await.is_err() {
                    break;
                }
            }
        });

        Self {
            result_rx,
            _handles: handles,
        }
    }

    /// Receive the next `(index, result)`. Returns `None` when all items have
    /// been answered and all workers have shut down.
    pub async fn recv(&mut self) -> Option<(usize, WorkResult<R>)> {
        self.result_rx.recv().await
    }
}
