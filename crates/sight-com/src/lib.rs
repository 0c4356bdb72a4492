// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # sight-com
//!
//! Communication layer shared by data objects and services.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  connect   ┌──────────────┐  post   ┌──────────────┐
//! │  Signal<A>   │ ─────────→ │   Slot<A>    │ ──────→ │    Worker    │
//! │ (emitter)    │            │ (receiver)   │         │ (task queue) │
//! └──────────────┘            └──────────────┘         └──────────────┘
//!         ↑                          ↑
//!         └──────── Proxy ───────────┘   channel-keyed many-to-many wiring
//! ```
//!
//! A slot without a worker runs synchronously on the emitting thread. A slot
//! bound to a worker receives its calls through the worker queue, so ordering
//! across threads is only eventually consistent.

pub mod erased;
pub mod proxy;
pub mod signal;
pub mod worker;

pub use erased::{AnySignal, AnySlot, Signals, Slots};
pub use proxy::Proxy;
pub use signal::{Connection, ConnectionSet, Signal, Slot};
pub use worker::{TaskFuture, Worker};

/// Communication layer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComError {
    #[error("Worker '{0}' is stopped")]
    WorkerStopped(String),

    #[error("Failed to spawn worker '{name}': {reason}")]
    WorkerSpawn { name: String, reason: String },

    #[error("Task was dropped before completion")]
    TaskDropped,

    #[error("Type mismatch: signal carries '{signal}' but slot expects '{slot}'")]
    TypeMismatch {
        signal: &'static str,
        slot: &'static str,
    },

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),
}

pub type Result<T> = std::result::Result<T, ComError>;
