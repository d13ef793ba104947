use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue '{0}' is closed")]
    Closed(&'static str),
}

/// Unbounded multi-producer, multi-consumer work queue with join semantics.
///
/// Every pushed item counts as outstanding until a consumer calls
/// [`WorkQueue::task_done`] for it; [`WorkQueue::join`] resolves once nothing
/// is outstanding. Consumers block in [`WorkQueue::pop`] until an item arrives
/// or the queue is closed.
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: &'static str,
    sender: Mutex<Option<mpsc::UnboundedSender<T>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>,
    outstanding: AtomicUsize,
    drained: Notify,
}

impl<T: Send> WorkQueue<T> {
    pub fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name,
            sender: Mutex::new(Some(tx)),
            receiver: tokio::sync::Mutex::new(rx),
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn push(&self, item: T) -> Result<(), QueueError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let sender = sender.as_ref().ok_or(QueueError::Closed(self.name))?;

        // Count before sending so a fast consumer can never observe an
        // item that is not yet outstanding.
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        if sender.send(item).is_err() {
            self.task_done();
            return Err(QueueError::Closed(self.name));
        }
        Ok(())
    }

    /// Wait for the next item. Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }

    /// Mark one previously popped item as fully processed.
    pub fn task_done(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "task_done called more times than push");
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Items pushed but not yet marked done.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until every pushed item has been marked done.
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting items. Consumers drain what is queued, then see `None`.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}
