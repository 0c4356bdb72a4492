// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dedicated worker threads draining a FIFO task queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{ComError, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Stop,
}

/// Named thread executing posted closures in order
///
/// Cloning a `Worker` shares the same thread. The thread stops when `stop()`
/// is called or when the last clone is dropped; queued tasks are drained first.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    name: String,
    sender: Sender<Message>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded::<Message>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_loop(receiver))
            .map_err(|e| ComError::WorkerSpawn {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Worker '{}' spawned", name);

        Ok(Self {
            inner: Arc::new(WorkerInner {
                name,
                thread_id: handle.thread().id(),
                sender,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue a closure on the worker
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner
            .sender
            .send(Message::Run(Box::new(task)))
            .map_err(|_| ComError::WorkerStopped(self.inner.name.clone()))
    }

    /// Queue a closure and get a future on its result
    pub fn post_task<T, F>(&self, task: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let posted = self.post(move || {
            // Receiver may be gone if the caller dropped the future
            let _ = tx.send(task());
        });

        match posted {
            Ok(()) => TaskFuture::pending(rx),
            Err(e) => TaskFuture::failed(e),
        }
    }

    /// True when called from this worker's own thread
    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Stop the worker after draining its queue (idempotent)
    pub fn stop(&self) {
        self.inner.shutdown();
    }

    /// True when both handles refer to the same thread
    pub fn same_as(&self, other: &Worker) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("name", &self.inner.name).finish()
    }
}

impl WorkerInner {
    fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };

        let _ = self.sender.send(Message::Stop);

        // A worker stopping itself cannot join its own thread
        if thread::current().id() == self.thread_id {
            return;
        }

        if handle.join().is_err() {
            warn!("Worker '{}' panicked while stopping", self.name);
        } else {
            debug!("Worker '{}' stopped", self.name);
        }
    }
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(receiver: Receiver<Message>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(task) => task(),
            Message::Stop => break,
        }
    }
}

/// Result of a task that may run on another thread
pub struct TaskFuture<T> {
    state: FutureState<T>,
}

enum FutureState<T> {
    Ready(T),
    Pending(Receiver<T>),
    Failed(ComError),
}

impl<T> TaskFuture<T> {
    /// Future already holding its value (task ran inline)
    pub fn ready(value: T) -> Self {
        Self {
            state: FutureState::Ready(value),
        }
    }

    fn pending(receiver: Receiver<T>) -> Self {
        Self {
            state: FutureState::Pending(receiver),
        }
    }

    pub fn failed(error: ComError) -> Self {
        Self {
            state: FutureState::Failed(error),
        }
    }

    /// True if the value is available without blocking
    pub fn is_ready(&self) -> bool {
        match &self.state {
            FutureState::Ready(_) | FutureState::Failed(_) => true,
            FutureState::Pending(rx) => !rx.is_empty(),
        }
    }

    /// Block until the task completes
    pub fn wait(self) -> Result<T> {
        match self.state {
            FutureState::Ready(value) => Ok(value),
            FutureState::Pending(rx) => rx.recv().map_err(|_| ComError::TaskDropped),
            FutureState::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_post_task_runs_on_worker_thread() {
        let worker = Worker::new("test-worker").unwrap();
        let probe = worker.clone();
        let on_worker = worker.post_task(move || probe.is_current_thread()).wait().unwrap();
        assert!(on_worker);
        assert!(!worker.is_current_thread());
    }

    #[test]
    fn test_tasks_run_in_order() {
        let worker = Worker::new("ordered").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let log = log.clone();
            worker.post(move || log.lock().push(i)).unwrap();
        }
        worker.post_task(|| ()).wait().unwrap();
        assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_stop_drains_queue_and_rejects_new_tasks() {
        let worker = Worker::new("draining").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            worker.post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        worker.stop();
        worker.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(matches!(worker.post(|| ()), Err(ComError::WorkerStopped(_))));
        assert!(worker.post_task(|| 1).wait().is_err());
    }

    #[test]
    fn test_ready_future() {
        let future = TaskFuture::ready(42);
        assert!(future.is_ready());
        assert_eq!(future.wait().unwrap(), 42);
    }
}
