// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Object-service registry (OSR).

Associations `(service, key, access) -> object` are kept in two indexes
under one lock:

```text
by_service: ServiceId    -> { service, [ (object, key, access) ] }
by_object:  ObjectHandle -> [ (service id, key, access) ]
```

At most one object exists per `(service, key, access)`; registering another
one replaces it. Only the output path announces changes, through the
`registered`/`unregistered` signals, which are emitted after the lock is
released.
*/

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use sight_com::Signal;
use sight_data::{Data, Object, ObjectArena, ObjectHandle};
use tracing::{debug, warn};

use crate::instance::ServiceInstance;
use crate::traits::Service;
use crate::types::{Access, RegistrationEvent, RegistryError, ServiceId};

/// Key used by the legacy object + service registration
pub const DEFAULT_KEY: &str = "defaultObject";

/// One object bound to a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub object: ObjectHandle,
    pub key: String,
    pub access: Access,
}

struct ServiceEntry {
    service: Arc<ServiceInstance>,
    associations: Vec<Association>,
}

#[derive(Default)]
struct Registry {
    by_service: AHashMap<ServiceId, ServiceEntry>,
    by_object: AHashMap<ObjectHandle, Vec<(ServiceId, String, Access)>>,
}

impl Registry {
    fn entry(&mut self, service: &Arc<ServiceInstance>) -> &mut ServiceEntry {
        self.by_service
            .entry(service.id())
            .or_insert_with(|| ServiceEntry {
                service: service.clone(),
                associations: Vec::new(),
            })
    }

    /// Insert or replace; returns the replaced object
    fn insert(
        &mut self,
        service: &Arc<ServiceInstance>,
        object: ObjectHandle,
        key: &str,
        access: Access,
    ) -> Option<ObjectHandle> {
        let id = service.id();
        let entry = self.entry(service);

        let replaced = match entry
            .associations
            .iter_mut()
            .find(|a| a.key == key && a.access == access)
        {
            Some(assoc) => Some(std::mem::replace(&mut assoc.object, object)),
            None => {
                entry.associations.push(Association {
                    object,
                    key: key.to_string(),
                    access,
                });
                None
            }
        };

        if let Some(old) = replaced {
            self.unlink(old, id, key, access);
        }
        self.by_object
            .entry(object)
            .or_default()
            .push((id, key.to_string(), access));

        service.cache_binding(key, access, Some(object));
        replaced
    }

    fn remove(&mut self, id: ServiceId, key: &str, access: Access) -> Option<ObjectHandle> {
        let entry = self.by_service.get_mut(&id)?;
        let pos = entry
            .associations
            .iter()
            .position(|a| a.key == key && a.access == access)?;
        let assoc = entry.associations.remove(pos);
        entry.service.cache_binding(key, access, None);

        self.unlink(assoc.object, id, key, access);
        Some(assoc.object)
    }

    fn unlink(&mut self, object: ObjectHandle, id: ServiceId, key: &str, access: Access) {
        if let Some(links) = self.by_object.get_mut(&object) {
            links.retain(|(s, k, a)| !(*s == id && k == key && *a == access));
            if links.is_empty() {
                self.by_object.remove(&object);
            }
        }
    }

    fn find(&self, id: ServiceId, key: &str, access: Access) -> Option<ObjectHandle> {
        self.by_service.get(&id).and_then(|entry| {
            entry
                .associations
                .iter()
                .find(|a| a.key == key && a.access == access)
                .map(|a| a.object)
        })
    }
}

pub struct ObjectService {
    arena: Arc<ObjectArena>,
    registry: RwLock<Registry>,
    registered: Signal<RegistrationEvent>,
    unregistered: Signal<RegistrationEvent>,
}

impl ObjectService {
    pub fn new(arena: Arc<ObjectArena>) -> Self {
        Self {
            arena,
            registry: RwLock::new(Registry::default()),
            registered: Signal::new(),
            unregistered: Signal::new(),
        }
    }

    pub fn arena(&self) -> &Arc<ObjectArena> {
        &self.arena
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add a service without any object (idempotent)
    pub fn register_service(&self, service: &Arc<ServiceInstance>) {
        self.registry.write().entry(service);
        debug!("Service '{}' registered", service.uid());
    }

    /// Legacy single-object registration under [`DEFAULT_KEY`]
    ///
    /// Kept for older call sites; new code registers with an explicit key.
    pub fn register_service_with_object(
        &self,
        object: ObjectHandle,
        service: &Arc<ServiceInstance>,
    ) -> Result<(), RegistryError> {
        self.ensure_live(object)?;
        let mut registry = self.registry.write();

        if let Some(entry) = registry.by_service.get(&service.id()) {
            if entry.associations.iter().any(|a| a.key != DEFAULT_KEY) {
                return Err(RegistryError::MixedRegistration(service.uid().to_string()));
            }
        }

        self.insert_logged(&mut registry, service, object, DEFAULT_KEY, Access::InOut);
        Ok(())
    }

    /// Bind `object` to `service` under `(key, access)`, replacing any previous one
    pub fn register_service_keyed(
        &self,
        object: ObjectHandle,
        key: &str,
        access: Access,
        service: &Arc<ServiceInstance>,
    ) -> Result<(), RegistryError> {
        self.ensure_live(object)?;
        let mut registry = self.registry.write();
        Self::check_keyed(&registry, key, service)?;
        self.insert_logged(&mut registry, service, object, key, access);
        Ok(())
    }

    pub fn register_service_input(
        &self,
        object: ObjectHandle,
        key: &str,
        service: &Arc<ServiceInstance>,
    ) -> Result<(), RegistryError> {
        self.register_service_keyed(object, key, Access::Input, service)
    }

    /// Register an object produced by `service` and emit `registered`
    ///
    /// A different object previously published under the same key is
    /// announced through `unregistered` first.
    pub fn register_service_output(
        &self,
        object: ObjectHandle,
        key: &str,
        service: &Arc<ServiceInstance>,
    ) -> Result<(), RegistryError> {
        self.ensure_live(object)?;

        let replaced = {
            let mut registry = self.registry.write();
            Self::check_keyed(&registry, key, service)?;
            self.insert_logged(&mut registry, service, object, key, Access::Output)
        };

        let id = service.object_id(key);
        if let Some(old) = replaced.filter(|old| *old != object) {
            self.unregistered.emit(RegistrationEvent {
                object: old,
                key: key.to_string(),
                id: id.clone(),
            });
        }

        debug!("Output '{}' of '{}' registered as {}", key, service.uid(), object);
        self.registered.emit(RegistrationEvent {
            object,
            key: key.to_string(),
            id,
        });
        Ok(())
    }

    fn check_keyed(
        registry: &Registry,
        key: &str,
        service: &ServiceInstance,
    ) -> Result<(), RegistryError> {
        if key == DEFAULT_KEY {
            return Ok(());
        }
        match registry.by_service.get(&service.id()) {
            Some(entry) if entry.associations.iter().any(|a| a.key == DEFAULT_KEY) => {
                Err(RegistryError::MixedRegistration(service.uid().to_string()))
            }
            _ => Ok(()),
        }
    }

    fn insert_logged(
        &self,
        registry: &mut Registry,
        service: &Arc<ServiceInstance>,
        object: ObjectHandle,
        key: &str,
        access: Access,
    ) -> Option<ObjectHandle> {
        let replaced = registry.insert(service, object, key, access);
        if let Some(old) = replaced.filter(|old| *old != object) {
            warn!(
                "Service '{}': object {} under '{}' ({}) replaced by {}",
                service.uid(),
                old,
                key,
                access,
                object
            );
        }
        replaced
    }

    fn ensure_live(&self, object: ObjectHandle) -> Result<(), RegistryError> {
        if self.arena.is_live(object) {
            Ok(())
        } else {
            Err(RegistryError::ObjectExpired(object))
        }
    }

    // ------------------------------------------------------------------
    // Unregistration
    // ------------------------------------------------------------------

    /// Remove the service and every association it has; returns how many
    /// associations were removed
    pub fn unregister_service(&self, service: &ServiceInstance) -> usize {
        let mut registry = self.registry.write();
        let Some(entry) = registry.by_service.remove(&service.id()) else {
            return 0;
        };

        for assoc in &entry.associations {
            service.cache_binding(&assoc.key, assoc.access, None);
            registry.unlink(assoc.object, service.id(), &assoc.key, assoc.access);
        }

        debug!("Service '{}' unregistered", service.uid());
        entry.associations.len()
    }

    /// Remove exactly one association
    pub fn unregister_service_keyed(
        &self,
        key: &str,
        access: Access,
        service: &ServiceInstance,
    ) -> Result<ObjectHandle, RegistryError> {
        self.registry
            .write()
            .remove(service.id(), key, access)
            .ok_or_else(|| RegistryError::NotRegistered {
                service: service.uid().to_string(),
                key: key.to_string(),
                access,
            })
    }

    /// Remove an output association and emit `unregistered`
    pub fn unregister_service_output(
        &self,
        key: &str,
        service: &ServiceInstance,
    ) -> Result<ObjectHandle, RegistryError> {
        let object = self.unregister_service_keyed(key, Access::Output, service)?;

        debug!("Output '{}' of '{}' unregistered", key, service.uid());
        self.unregistered.emit(RegistrationEvent {
            object,
            key: key.to_string(),
            id: service.object_id(key),
        });
        Ok(object)
    }

    /// Point the service's first association at another object
    #[deprecated(note = "register under an explicit key instead")]
    pub fn swap_service(
        &self,
        new_object: ObjectHandle,
        service: &Arc<ServiceInstance>,
    ) -> Result<(), RegistryError> {
        self.ensure_live(new_object)?;
        let mut registry = self.registry.write();

        let (key, access) = registry
            .by_service
            .get(&service.id())
            .and_then(|entry| entry.associations.first())
            .map(|a| (a.key.clone(), a.access))
            .ok_or_else(|| RegistryError::ServiceNotRegistered(service.uid().to_string()))?;

        registry.insert(service, new_object, &key, access);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_registered(&self, key: &str, access: Access, service: &ServiceInstance) -> bool {
        self.get_registered(key, access, service).is_some()
    }

    pub fn get_registered(
        &self,
        key: &str,
        access: Access,
        service: &ServiceInstance,
    ) -> Option<ObjectHandle> {
        self.registry.read().find(service.id(), key, access)
    }

    /// Registered object resolved through the arena
    pub fn get_registered_object(
        &self,
        key: &str,
        access: Access,
        service: &ServiceInstance,
    ) -> Option<Arc<Object>> {
        self.get_registered(key, access, service)
            .and_then(|handle| self.arena.get(handle))
    }

    pub fn is_service_registered(&self, service: &ServiceInstance) -> bool {
        self.registry.read().by_service.contains_key(&service.id())
    }

    pub fn associations(&self, service: &ServiceInstance) -> Vec<Association> {
        self.registry
            .read()
            .by_service
            .get(&service.id())
            .map(|entry| entry.associations.clone())
            .unwrap_or_default()
    }

    fn collect_services<F>(&self, filter: F) -> Vec<Arc<ServiceInstance>>
    where
        F: Fn(&ServiceInstance) -> bool,
    {
        let registry = self.registry.read();
        let mut services: Vec<Arc<ServiceInstance>> = registry
            .by_service
            .values()
            .filter(|entry| filter(&entry.service))
            .map(|entry| entry.service.clone())
            .collect();
        services.sort_by_key(|srv| srv.id());
        services
    }

    /// Registered services of the given classname, each once
    pub fn get_services_of_type(&self, classname: &str) -> Vec<Arc<ServiceInstance>> {
        self.collect_services(|srv| srv.classname() == classname)
    }

    /// Registered services implemented by `T`
    pub fn get_services<T: Service>(&self) -> Vec<Arc<ServiceInstance>> {
        self.collect_services(|srv| srv.is::<T>())
    }

    pub fn find_service(&self, uid: &str) -> Option<Arc<ServiceInstance>> {
        self.collect_services(|srv| srv.uid() == uid).into_iter().next()
    }

    /// Services bound to `object` under any key, optionally of one classname
    pub fn get_services_for_object(
        &self,
        object: ObjectHandle,
        classname: Option<&str>,
    ) -> Vec<Arc<ServiceInstance>> {
        let registry = self.registry.read();
        let Some(links) = registry.by_object.get(&object) else {
            return Vec::new();
        };

        let mut ids: Vec<ServiceId> = links.iter().map(|(id, _, _)| *id).collect();
        ids.sort();
        ids.dedup();

        ids.into_iter()
            .filter_map(|id| registry.by_service.get(&id))
            .filter(|entry| classname.map_or(true, |c| entry.service.classname() == c))
            .map(|entry| entry.service.clone())
            .collect()
    }

    /// Objects bound to at least one service
    pub fn get_objects(&self) -> Vec<ObjectHandle> {
        let mut objects: Vec<ObjectHandle> =
            self.registry.read().by_object.keys().copied().collect();
        objects.sort();
        objects
    }

    pub fn get_objects_of_type<T: Data>(&self) -> Vec<ObjectHandle> {
        self.get_objects()
            .into_iter()
            .filter(|handle| self.arena.get(*handle).is_some_and(|obj| obj.is::<T>()))
            .collect()
    }

    /// True if a service of `classname` is bound to `object`
    pub fn has(&self, object: ObjectHandle, classname: &str) -> bool {
        !self.get_services_for_object(object, Some(classname)).is_empty()
    }

    /// Emitted with every object registered as an output
    pub fn registered_signal(&self) -> Signal<RegistrationEvent> {
        self.registered.clone()
    }

    /// Emitted with every output object unregistered or replaced
    pub fn unregistered_signal(&self) -> Signal<RegistrationEvent> {
        self.unregistered.clone()
    }

    pub fn service_count(&self) -> usize {
        self.registry.read().by_service.len()
    }

    pub fn association_count(&self) -> usize {
        self.registry
            .read()
            .by_service
            .values()
            .map(|entry| entry.associations.len())
            .sum()
    }
}
