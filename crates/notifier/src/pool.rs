//! Bounded worker pool for delivery tasks.
//!
//! A fixed number of tokio workers pull boxed futures off a bounded queue, so
//! at most `size` deliveries run at any time no matter how many broadcasts are
//! in flight. The pool is created once and shared for the process lifetime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use matchday_common::types::PoolSaturation;

use crate::error::DispatchError;

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    saturation: PoolSaturation,
}

impl WorkerPool {
    /// Spawn `size` workers sharing a queue of `queue_capacity` pending tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(size: usize, queue_capacity: usize, saturation: PoolSaturation) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Task>(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|worker_id| {
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    loop {
                        let task = { receiver.lock().await.recv().await };
                        let Some(task) = task else { break };

                        // Run on its own task so a panicking delivery does not take the worker down.
                        if let Err(e) = tokio::spawn(task).await {
                            tracing::error!(worker_id, error = %e, "Delivery task panicked");
                        }
                    }
                    tracing::debug!(worker_id, "Worker stopped");
                })
            })
            .collect();

        tracing::info!(size, queue_capacity, saturation = %saturation, "Worker pool started");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            saturation,
        }
    }

    /// Queue a task. With `PoolSaturation::Block` this waits for a free slot,
    /// with `PoolSaturation::Reject` a full queue fails immediately.
    pub async fn submit<F>(&self, task: F) -> Result<(), DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.lock().clone().ok_or(DispatchError::PoolClosed)?;
        let task: Task = Box::pin(task);

        match self.saturation {
            PoolSaturation::Block => sender
                .send(task)
                .await
                .map_err(|_| DispatchError::PoolClosed),
            PoolSaturation::Reject => sender.try_send(task).map_err(|e| match e {
                TrySendError::Full(_) => DispatchError::PoolSaturated,
                TrySendError::Closed(_) => DispatchError::PoolClosed,
            }),
        }
    }

    /// Stop accepting tasks and wait until everything already queued has run.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());

        tracing::info!(workers = workers.len(), "Draining worker pool");
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker exited abnormally");
            }
        }
    }
}
