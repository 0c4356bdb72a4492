// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed signals, slots and the connections between them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::warn;

use crate::worker::{TaskFuture, Worker};

/// Receiver side of a connection
///
/// A slot optionally targets a worker: calls made through `async_run` or
/// through a signal emission are then queued on that worker.
pub struct Slot<A> {
    inner: Arc<SlotInner<A>>,
}

struct SlotInner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    worker: RwLock<Option<Worker>>,
}

impl<A: Send + 'static> Slot<A> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SlotInner {
                func: Box::new(func),
                worker: RwLock::new(None),
            }),
        }
    }

    pub fn with_worker(self, worker: Worker) -> Self {
        self.set_worker(Some(worker));
        self
    }

    pub fn set_worker(&self, worker: Option<Worker>) {
        *self.inner.worker.write() = worker;
    }

    pub fn worker(&self) -> Option<Worker> {
        self.inner.worker.read().clone()
    }

    /// Call the slot on the current thread
    pub fn run(&self, args: A) {
        (self.inner.func)(args)
    }

    /// Queue the call on the slot's worker, or call inline when it has none
    ///
    /// The call is queued even from the worker's own thread, so it runs once
    /// the current task returns.
    pub fn async_run(&self, args: A) -> TaskFuture<()> {
        match self.worker() {
            Some(worker) => {
                let inner = self.inner.clone();
                worker.post_task(move || (inner.func)(args))
            }
            None => {
                self.run(args);
                TaskFuture::ready(())
            }
        }
    }

    /// Call inline when there is no worker or we are on it, queue otherwise
    pub fn run_or_post(&self, args: A) -> TaskFuture<()> {
        match self.worker() {
            Some(worker) if !worker.is_current_thread() => {
                let inner = self.inner.clone();
                worker.post_task(move || (inner.func)(args))
            }
            _ => {
                self.run(args);
                TaskFuture::ready(())
            }
        }
    }

    pub(crate) fn same_as(&self, other: &Slot<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Clone for Slot<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Emitter side of a connection
pub struct Signal<A> {
    inner: Arc<SignalInner<A>>,
}

struct SignalInner<A> {
    slots: RwLock<Vec<(u64, Slot<A>)>>,
    next_id: AtomicU64,
}

impl<A: Clone + Send + 'static> Signal<A> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                slots: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Connect a slot; the same slot may be connected several times
    pub fn connect(&self, slot: &Slot<A>) -> Connection {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.slots.write().push((id, slot.clone()));

        let target: Arc<dyn Disconnect> = self.inner.clone();
        Connection {
            target: Some(Arc::downgrade(&target)),
            id,
        }
    }

    /// Disconnect every connection to the given slot
    pub fn disconnect(&self, slot: &Slot<A>) -> usize {
        let mut slots = self.inner.slots.write();
        let before = slots.len();
        slots.retain(|(_, s)| !s.same_as(slot));
        before - slots.len()
    }

    /// Deliver `args` to every connected slot
    ///
    /// Slots without a worker run before this returns; the others are queued
    /// on their worker. Returns the number of slots the signal was delivered to.
    pub fn emit(&self, args: A) -> usize {
        let slots = self.snapshot();
        for slot in &slots {
            // Queued calls complete on their own; nothing to wait for
            let _ = slot.async_run(args.clone());
        }
        slots.len()
    }

    /// Deliver `args` and block until every slot has run
    ///
    /// Slots bound to the current thread's worker run inline instead of being
    /// queued behind the caller.
    pub fn emit_and_wait(&self, args: A) -> usize {
        let futures: Vec<TaskFuture<()>> = self
            .snapshot()
            .iter()
            .map(|slot| slot.run_or_post(args.clone()))
            .collect();
        let count = futures.len();
        for future in futures {
            if let Err(e) = future.wait() {
                warn!("Slot call dropped: {}", e);
            }
        }
        count
    }

    // Snapshot so slots can connect/disconnect while being called
    fn snapshot(&self) -> Vec<Slot<A>> {
        self.inner.slots.read().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn num_connections(&self) -> usize {
        self.inner.slots.read().len()
    }
}

impl<A: Clone + Send + 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

trait Disconnect: Send + Sync {
    fn disconnect(&self, id: u64) -> bool;
    fn is_connected(&self, id: u64) -> bool;
}

impl<A: Send + 'static> Disconnect for SignalInner<A> {
    fn disconnect(&self, id: u64) -> bool {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|(conn_id, _)| *conn_id != id);
        before != slots.len()
    }

    fn is_connected(&self, id: u64) -> bool {
        self.slots.read().iter().any(|(conn_id, _)| *conn_id == id)
    }
}

/// Handle on one signal-slot connection
///
/// Dropping the handle keeps the connection alive; call `disconnect()`.
#[derive(Clone, Default)]
pub struct Connection {
    target: Option<Weak<dyn Disconnect>>,
    id: u64,
}

impl Connection {
    /// Disconnect (idempotent); returns true if something was disconnected
    pub fn disconnect(&self) -> bool {
        self.target
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|signal| signal.disconnect(self.id))
            .unwrap_or(false)
    }

    pub fn is_connected(&self) -> bool {
        self.target
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|signal| signal.is_connected(self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Group of connections torn down together
#[derive(Debug, Default)]
pub struct ConnectionSet {
    connections: Vec<Connection>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn disconnect_all(&mut self) {
        for connection in self.connections.drain(..) {
            connection.disconnect();
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
