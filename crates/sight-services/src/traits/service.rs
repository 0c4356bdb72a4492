// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Behaviour hooks implemented by concrete services.

A `Service` only describes what happens at each lifecycle step. State,
object bindings, signals and worker dispatch live in
[`ServiceInstance`](crate::ServiceInstance), which calls these hooks.
*/

use std::any::Any;

use ahash::AHashMap;
use sight_com::{Signals, Slots};

use crate::instance::ServiceInstance;
use crate::types::ServiceResult;

/// Per object key, the (object signal, service slot) pairs to connect
/// while the service is started
pub type KeyConnections = AHashMap<String, Vec<(String, String)>>;

pub trait Service: Send + Sync + 'static {
    /// Fully qualified class name, also the key used by `ServiceFactory`
    fn classname(&self) -> &'static str;

    fn configuring(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        Ok(())
    }

    fn starting(&self, srv: &ServiceInstance) -> ServiceResult<()>;

    fn stopping(&self, srv: &ServiceInstance) -> ServiceResult<()>;

    fn updating(&self, srv: &ServiceInstance) -> ServiceResult<()>;

    /// Called on a started service when an optional object changes
    fn swapping(&self, _srv: &ServiceInstance, _key: &str) -> ServiceResult<()> {
        Ok(())
    }

    /// Connections made for auto-connected keys
    ///
    /// Keys missing from the map fall back to `modified` -> `update`.
    fn auto_connections(&self) -> KeyConnections {
        KeyConnections::default()
    }

    /// Declare extra signals and slots
    fn init_com(&self, _signals: &Signals, _slots: &Slots) {}

    fn as_any(&self) -> &dyn Any;
}
