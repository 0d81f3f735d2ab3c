//! Bounded worker pool for external-process tasks
//!
//! Tasks are handed to a single dispatcher loop over an unbounded channel, so
//! they start in the order they were submitted. The dispatcher acquires a slot
//! from a semaphore before spawning each task and the task holds the slot until
//! it finishes. Completion order across tasks is unconstrained.
//!
//! Every submitted task resolves through its [`TaskHandle`]: with the task's own
//! output, with [`Error::Other`] if the task panicked, or with
//! [`Error::ShuttingDown`] if the pool was closed before the task got a slot.

use crate::error::{Error, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::{Semaphore, mpsc, oneshot};

type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Fixed-size pool of execution slots (cheap to clone)
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    size: usize,
    slots: Arc<Semaphore>,
    queue: Mutex<Option<mpsc::UnboundedSender<BoxTask>>>,
    closed: AtomicBool,
}

/// Resolves to the output of a submitted task
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the task never ran
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(Error::ShuttingDown)))
    }
}

impl WorkerPool {
    /// Create a pool with `size` slots and start its dispatcher
    ///
    /// Must be called from within a Tokio runtime. A size of zero is raised to one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let slots = Arc::new(Semaphore::new(size));
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch(rx, slots.clone()));

        Self {
            inner: Arc::new(PoolInner {
                size,
                slots,
                queue: Mutex::new(Some(tx)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Queue a task; it starts once a slot is free
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let wrapped: BoxTask = Box::pin(async move {
            let result = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|_| Error::Other("worker task panicked".into()));
            let _ = done_tx.send(result);
        });

        let queue = self.inner.queue.lock().unwrap_or_else(|e| e.into_inner());
        match queue.as_ref() {
            Some(tx) => {
                // On send failure the task is dropped and the handle resolves as shut down.
                let _ = tx.send(wrapped);
            }
            None => {
                tracing::debug!("worker pool closed, rejecting task");
            }
        }

        TaskHandle { rx: done_rx }
    }

    /// Stop accepting tasks and abandon those still waiting for a slot
    ///
    /// Tasks that already hold a slot run to completion.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.inner.slots.close();
        tracing::info!(size = self.inner.size, "worker pool closed");
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of slots currently held by running tasks
    pub fn in_flight(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.inner.size - self.inner.slots.available_permits()
    }
}

async fn dispatch(mut rx: mpsc::UnboundedReceiver<BoxTask>, slots: Arc<Semaphore>) {
    while let Some(task) = rx.recv().await {
        let permit = match slots.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                // Pool closed while the task was queued
                drop(task);
                continue;
            }
        };

        tokio::spawn(async move {
            let _permit = permit;
            task.await;
        });
    }
    tracing::debug!("worker pool dispatcher stopped");
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_returns_task_output() {
        let pool = WorkerPool::new(2);
        let handle = pool.submit(async { 21 * 2 });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn never_exceeds_slot_count() {
        let pool = WorkerPool::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            result.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn queued_tasks_start_in_arrival_order() {
        let pool = WorkerPool::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5)
            .map(|n| {
                let order = order.clone();
                pool.submit(async move {
                    order.lock().unwrap().push(n);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                })
            })
            .collect();

        futures::future::join_all(handles).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn close_resolves_queued_tasks_as_shutting_down() {
        let pool = WorkerPool::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let running = pool.submit(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            "finished"
        });
        started_rx.await.unwrap();

        let queued = pool.submit(async { "never" });
        // Let the dispatcher pick up the queued task and park on the semaphore
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(queued.await, Err(Error::ShuttingDown)));

        release_tx.send(()).unwrap();
        assert_eq!(running.await.unwrap(), "finished");
    }

    #[tokio::test]
    async fn submit_after_close_is_rejected() {
        let pool = WorkerPool::new(2);
        pool.close();
        pool.close();
        let handle = pool.submit(async { 1 });
        assert!(matches!(handle.await, Err(Error::ShuttingDown)));
    }

    #[tokio::test]
    async fn panicking_task_resolves_as_error_and_frees_its_slot() {
        let pool = WorkerPool::new(1);
        let handle = pool.submit(async {
            if true {
                panic!("boom");
            }
        });
        assert!(matches!(handle.await, Err(Error::Other(_))));
        assert_eq!(pool.submit(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn zero_size_is_raised_to_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.submit(async { "ok" }).await.unwrap(), "ok");
    }
}
