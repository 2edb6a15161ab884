//! Outbound request queue with fixed pacing
//!
//! This module handles:
//! - Serializing every outbound call through one background worker
//! - Enforcing a minimum gap between the start of consecutive dispatches
//! - Dropping queued work whose scan has been cancelled
//!
//! The queue is unbounded and strictly FIFO with no priorities. A task that
//! has been dispatched always runs to completion; cancellation only affects
//! tasks still waiting in line.

use crate::state::CancelToken;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Errors returned for work submitted to the queue
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Request cancelled before dispatch")]
    Cancelled,

    #[error("Request queue worker has stopped")]
    Closed,
}

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of work waiting for the worker
struct Job {
    cancel: CancelToken,
    task: Task,
}

/// Handle to a submitted task's eventual output
pub struct Ticket<T> {
    rx: oneshot::Receiver<T>,
    cancel: CancelToken,
}

impl<T> Ticket<T> {
    /// Waits for the task to run and returns its output
    pub async fn wait(self) -> Result<T, QueueError> {
        match self.rx.await {
            Ok(output) => Ok(output),
            Err(_) if self.cancel.is_cancelled() => Err(QueueError::Cancelled),
            Err(_) => Err(QueueError::Closed),
        }
    }
}

/// FIFO request queue, concurrency 1, with a minimum dispatch interval
///
/// Cloning yields another handle to the same worker, so every clone shares
/// one pacing clock.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Job>,
    min_interval: Duration,
}

impl RequestQueue {
    /// Creates a queue and spawns its worker
    ///
    /// Must be called from within a tokio runtime. The worker exits once every
    /// handle has been dropped and the backlog is drained.
    pub fn new(min_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, min_interval));
        Self { tx, min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Appends a task to the queue without waiting for it
    ///
    /// # Returns
    ///
    /// * `Ok(Ticket)` - The task is queued; await [`Ticket::wait`] for its output
    /// * `Err(QueueError::Cancelled)` - `cancel` was already set
    /// * `Err(QueueError::Closed)` - The worker is gone
    pub fn submit<F, T>(&self, cancel: &CancelToken, task: F) -> Result<Ticket<T>, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        let (done_tx, done_rx) = oneshot::channel();
        let job = Job {
            cancel: cancel.clone(),
            task: Box::pin(async move {
                // The submitter may have stopped listening; the work is done either way
                let _ = done_tx.send(task.await);
            }),
        };
        self.tx.send(job).map_err(|_| QueueError::Closed)?;

        Ok(Ticket {
            rx: done_rx,
            cancel: cancel.clone(),
        })
    }

    /// Queues a task and waits for its output
    pub async fn enqueue<F, T>(&self, cancel: &CancelToken, task: F) -> Result<T, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(cancel, task)?.wait().await
    }
}

/// Drains the queue one task at a time
async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, min_interval: Duration) {
    let mut last_dispatch: Option<Instant> = None;

    while let Some(job) = rx.recv().await {
        if job.cancel.is_cancelled() {
            tracing::trace!("Dropping cancelled request before dispatch");
            continue;
        }

        if let Some(last) = last_dispatch {
            tokio::time::sleep_until(last + min_interval).await;

            // The scan may have been cancelled while we were waiting
            if job.cancel.is_cancelled() {
                tracing::trace!("Dropping cancelled request before dispatch");
                continue;
            }
        }

        last_dispatch = Some(Instant::now());
        job.task.await;
    }

    tracing::debug!("Request queue worker stopped");
}
