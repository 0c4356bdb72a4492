// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Services and helpers shared by the integration tests

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use sight::com::Slot;
use sight::data::{Integer, ObjectArena};
use sight::observability::CrateDebugFlags;
use sight::services::{RegistrationEvent, Service, ServiceContext, ServiceInstance, ServiceResult};

/// Counts its lifecycle hooks
#[derive(Default)]
pub struct CountingService {
    calls: Mutex<Vec<&'static str>>,
}

impl CountingService {
    pub const CLASSNAME: &'static str = "sight::test::Counting";

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == name).count()
    }
}

impl Service for CountingService {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn starting(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.calls.lock().push("starting");
        Ok(())
    }

    fn stopping(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.calls.lock().push("stopping");
        Ok(())
    }

    fn updating(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.calls.lock().push("updating");
        Ok(())
    }

    fn swapping(&self, _srv: &ServiceInstance, _key: &str) -> ServiceResult<()> {
        self.calls.lock().push("swapping");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Publishes an `Integer` under `out` while started
pub struct ProducerService {
    arena: Arc<ObjectArena>,
}

impl ProducerService {
    pub const CLASSNAME: &'static str = "sight::test::Producer";
    pub const OUTPUT: &'static str = "out";

    pub fn new(arena: Arc<ObjectArena>) -> Self {
        Self { arena }
    }
}

impl Service for ProducerService {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn starting(&self, srv: &ServiceInstance) -> ServiceResult<()> {
        let handle = self.arena.create(Integer(42))?;
        srv.set_output(Self::OUTPUT, Some(handle))
    }

    fn stopping(&self, srv: &ServiceInstance) -> ServiceResult<()> {
        srv.set_output(Self::OUTPUT, None)
    }

    fn updating(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Console logging for the test binary; `--debug-sight-services` etc. apply
pub fn init_logging() {
    let flags = CrateDebugFlags::from_args(std::env::args());
    let _ = sight::observability::init_logging_default(&flags);
}

/// Context with both test service types registered in its factory
pub fn context() -> ServiceContext {
    init_logging();
    let ctx = ServiceContext::new();
    ctx.services
        .register(CountingService::CLASSNAME, CountingService::default);
    let arena = ctx.arena.clone();
    ctx.services.register(ProducerService::CLASSNAME, move || {
        ProducerService::new(arena.clone())
    });
    ctx
}

pub fn counting(srv: &ServiceInstance) -> &CountingService {
    srv.service_as::<CountingService>()
        .expect("service is a CountingService")
}

/// Collects registration events as `"<label> <key> <id or ->"`
#[derive(Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn slot(&self, label: &'static str) -> Slot<RegistrationEvent> {
        let events = self.events.clone();
        Slot::new(move |event: RegistrationEvent| {
            events.lock().push(format!(
                "{} {} {}",
                label,
                event.key,
                event.id.as_deref().unwrap_or("-")
            ))
        })
    }
}
