// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Shared runtime handles.

A `ServiceContext` bundles the collaborators every service and manager
needs: the object arena, the registry, the factories and the proxy hub.
Cloning is cheap; all members are `Arc`s.
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sight_com::Proxy;
use sight_data::{DataFactory, ObjectArena};

use crate::factory::ServiceFactory;
use crate::instance::ServiceInstance;
use crate::registry::ObjectService;
use crate::traits::Service;
use crate::types::ServiceResult;

static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct ServiceContext {
    pub arena: Arc<ObjectArena>,
    pub osr: Arc<ObjectService>,
    pub services: Arc<ServiceFactory>,
    pub data: Arc<DataFactory>,
    pub proxy: Arc<Proxy>,
}

impl ServiceContext {
    pub fn new() -> Self {
        let arena = Arc::new(ObjectArena::new());
        Self {
            osr: Arc::new(ObjectService::new(arena.clone())),
            arena,
            services: Arc::new(ServiceFactory::new()),
            data: Arc::new(DataFactory::with_builtins()),
            proxy: Arc::new(Proxy::new()),
        }
    }

    /// Build a service of `classname`; an empty uid is generated
    pub fn create_service(&self, classname: &str, uid: &str) -> ServiceResult<Arc<ServiceInstance>> {
        let service = self.services.create(classname)?;
        Ok(ServiceInstance::new(self, service, resolve_uid(classname, uid)))
    }

    /// Like `create_service`, and register the bare service in the registry
    pub fn add_service(&self, classname: &str, uid: &str) -> ServiceResult<Arc<ServiceInstance>> {
        let srv = self.create_service(classname, uid)?;
        self.osr.register_service(&srv);
        Ok(srv)
    }

    /// Wrap an already built implementation and register it
    pub fn wrap_service<S: Service>(&self, service: S, uid: &str) -> Arc<ServiceInstance> {
        let uid = resolve_uid(service.classname(), uid);
        let srv = ServiceInstance::new(self, Box::new(service), uid);
        self.osr.register_service(&srv);
        srv
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_uid(classname: &str, uid: &str) -> String {
    if !uid.is_empty() {
        return uid.to_string();
    }
    let n = UID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let leaf = classname.rsplit("::").next().unwrap_or(classname);
    format!("{}-{}", leaf, n)
}
