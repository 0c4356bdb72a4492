// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Name-keyed, type-erased signal and slot maps.
//!
//! Objects and services expose their signals and slots by name so that
//! configuration-driven wiring (proxy channels, auto-connections) can connect
//! them without knowing argument types. Types are checked when connecting.

use std::any::{type_name, Any};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::signal::{Connection, Signal, Slot};
use crate::worker::Worker;
use crate::{ComError, Result};

pub trait AnySlot: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Name of the argument type, for diagnostics
    fn arg_type(&self) -> &'static str;

    fn set_worker(&self, worker: Option<Worker>);
}

impl<A: Send + 'static> AnySlot for Slot<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn arg_type(&self) -> &'static str {
        type_name::<A>()
    }

    fn set_worker(&self, worker: Option<Worker>) {
        Slot::set_worker(self, worker)
    }
}

pub trait AnySignal: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn arg_type(&self) -> &'static str;

    /// Connect to a slot carrying the same argument type
    fn connect_any(&self, slot: &dyn AnySlot) -> Result<Connection>;

    fn num_connections(&self) -> usize;
}

impl<A: Clone + Send + 'static> AnySignal for Signal<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn arg_type(&self) -> &'static str {
        type_name::<A>()
    }

    fn connect_any(&self, slot: &dyn AnySlot) -> Result<Connection> {
        match slot.as_any().downcast_ref::<Slot<A>>() {
            Some(slot) => Ok(self.connect(slot)),
            None => Err(ComError::TypeMismatch {
                signal: type_name::<A>(),
                slot: slot.arg_type(),
            }),
        }
    }

    fn num_connections(&self) -> usize {
        Signal::num_connections(self)
    }
}

/// Signals of one object or service, keyed by name
#[derive(Default)]
pub struct Signals {
    map: RwLock<AHashMap<String, Arc<dyn AnySignal>>>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a new signal, replacing any previous one with that key
    pub fn new_signal<A: Clone + Send + 'static>(&self, key: &str) -> Signal<A> {
        let signal = Signal::<A>::new();
        self.map.write().insert(key.to_string(), Arc::new(signal.clone()));
        signal
    }

    /// Typed lookup; `None` if absent or carrying another argument type
    pub fn get<A: Clone + Send + 'static>(&self, key: &str) -> Option<Signal<A>> {
        self.map
            .read()
            .get(key)
            .and_then(|signal| signal.as_any().downcast_ref::<Signal<A>>().cloned())
    }

    pub fn get_any(&self, key: &str) -> Option<Arc<dyn AnySignal>> {
        self.map.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Slots of one object or service, keyed by name
#[derive(Default)]
pub struct Slots {
    map: RwLock<AHashMap<String, Arc<dyn AnySlot>>>,
    worker: RwLock<Option<Worker>>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a slot; it inherits the worker currently set on this map
    pub fn insert<A: Send + 'static>(&self, key: &str, slot: Slot<A>) -> Slot<A> {
        if let Some(worker) = self.worker.read().clone() {
            slot.set_worker(Some(worker));
        }
        self.map.write().insert(key.to_string(), Arc::new(slot.clone()));
        slot
    }

    pub fn get<A: Send + 'static>(&self, key: &str) -> Option<Slot<A>> {
        self.map
            .read()
            .get(key)
            .and_then(|slot| slot.as_any().downcast_ref::<Slot<A>>().cloned())
    }

    pub fn get_any(&self, key: &str) -> Option<Arc<dyn AnySlot>> {
        self.map.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.read().contains_key(key)
    }

    /// Bind every slot (present and future) to a worker
    pub fn set_worker(&self, worker: Option<Worker>) {
        for slot in self.map.read().values() {
            slot.set_worker(worker.clone());
        }
        *self.worker.write() = worker;
    }

    pub fn worker(&self) -> Option<Worker> {
        self.worker.read().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_typed_lookup() {
        let signals = Signals::new();
        signals.new_signal::<i32>("value_changed");

        assert!(signals.get::<i32>("value_changed").is_some());
        assert!(signals.get::<String>("value_changed").is_none());
        assert!(signals.get::<i32>("missing").is_none());
        assert_eq!(signals.keys(), vec!["value_changed".to_string()]);
    }

    #[test]
    fn test_connect_any_checks_types() {
        let signals = Signals::new();
        let slots = Slots::new();
        let hit = Arc::new(AtomicBool::new(false));
        let h = hit.clone();

        let signal = signals.new_signal::<i32>("sig");
        slots.insert("good", Slot::new(move |_: i32| h.store(true, Ordering::SeqCst)));
        slots.insert("bad", Slot::new(|_: String| {}));

        let any_signal = signals.get_any("sig").unwrap();
        let err = any_signal
            .connect_any(slots.get_any("bad").unwrap().as_ref())
            .unwrap_err();
        assert!(matches!(err, ComError::TypeMismatch { .. }));

        any_signal
            .connect_any(slots.get_any("good").unwrap().as_ref())
            .unwrap();
        signal.emit(3);
        assert!(hit.load(Ordering::SeqCst));
    }
}
