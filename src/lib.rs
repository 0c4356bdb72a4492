// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Sight
//!
//! Data-driven service pipelines: services bind to shared data objects by
//! key, an object-service registry tracks who uses what, and an application
//! manager starts services once every object they require is available.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! sight = "0.1"
//! ```
//!
//! ## Feature Flags
//! - **`file-logging`**: daily rolling log files next to console output
//!
//! ## Crates
//! - [`com`]: workers, signals, slots and proxy channels
//! - [`data`]: data objects, the object arena and the data factory
//! - [`config`]: `sight.toml` loading and validation
//! - [`observability`]: logging setup and per-crate debug flags
//! - [`services`]: the registry, service instances and the app manager

pub use sight_com as com;
pub use sight_config as config;
pub use sight_data as data;
pub use sight_observability as observability;
pub use sight_services as services;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::com::{Signal, Slot, Worker};
    pub use crate::config::{load_config, validate_config, SightConfig};
    pub use crate::data::{Data, Object, ObjectArena, ObjectHandle};
    pub use crate::observability::{init_logging, CrateDebugFlags, ObservabilityConfig};
    pub use crate::services::{
        Access, AppManager, ObjectService, Service, ServiceContext, ServiceInstance,
        ServiceState,
    };
}
