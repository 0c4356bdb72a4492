// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Application manager: starts services once the objects they need exist.

The manager tracks objects by logical id. Every time an object is added
(explicitly, or because a producer published an output through the
registry) the services declaring that id get it bound, and auto-start
services whose requirements are now all met are started. Removing an object
stops the services that cannot run without it.

```text
 OSR registered ──→ add_object(id) ──→ bind on services ──→ start ready ones
 OSR unregistered ─→ remove_object(id) ─→ stop dependants ──→ unbind
```

When the manager has a worker, its public operations and its registry
slots all run on that worker, one after the other. Without a worker they run
on the calling thread under a reentrant lock, so a service hook may call
back into the manager.

A registry event raised on another thread while the manager is busy (a
service on its own worker publishing an output during `start_services`, for
instance) is deferred to a lazily spawned registry worker. The operation
that held the manager waits for those events before returning.
*/

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use sight_com::{ConnectionSet, Slot, Worker};
use sight_config::{AppConfig, AppManagerSettings};
use sight_data::ObjectHandle;
use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::instance::ServiceInstance;
use crate::registry::ProxyConnections;
use crate::types::{Access, RegistrationEvent, ServiceError, ServiceResult};

static MANAGER_COUNTER: AtomicUsize = AtomicUsize::new(0);
static CHANNEL_COUNTER: AtomicUsize = AtomicUsize::new(0);

type RegistryAction = fn(&AppManager, ObjectHandle, &str) -> ServiceResult<()>;

/// Kind of value an input stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputType {
    /// Logical id of a data object
    Object,
    /// Proxy channel name
    Channel,
    /// Any other string parameter
    Other,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::Object => write!(f, "object"),
            InputType::Channel => write!(f, "channel"),
            InputType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "object" => Ok(InputType::Object),
            "channel" => Ok(InputType::Channel),
            "other" => Ok(InputType::Other),
            _ => Err(format!("Invalid input type: {}", s)),
        }
    }
}

/// Named parameter of a manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub key: String,
    pub input_type: InputType,
    pub value: String,
    /// Classname for objects, plain value otherwise
    pub default_value: String,
    pub optional: bool,
}

/// A managed service and its start policy
#[derive(Clone)]
struct ServiceInfo {
    service: Arc<ServiceInstance>,
    auto_start: bool,
    auto_update: bool,
}

#[derive(Default)]
struct ManagerState {
    services: Vec<ServiceInfo>,
    started: Vec<Arc<ServiceInstance>>,
    objects: BTreeMap<String, ObjectHandle>,
    /// uid or object id -> channel -> connections
    proxies: AHashMap<String, BTreeMap<String, ProxyConnections>>,
    inputs: BTreeMap<String, Input>,
    registry_connections: ConnectionSet,
    is_started: bool,
}

pub struct AppManager {
    ctx: ServiceContext,
    id: String,
    state: ReentrantMutex<RefCell<ManagerState>>,
    worker: RwLock<Option<Worker>>,
    add_object_slot: Slot<RegistrationEvent>,
    remove_object_slot: Slot<RegistrationEvent>,
    /// Runs registry events that arrived while another thread held the state
    registry_worker: Mutex<Option<Worker>>,
    deferred: AtomicUsize,
    self_ref: Weak<AppManager>,
}

impl AppManager {
    pub fn new(ctx: &ServiceContext, name: &str) -> Arc<Self> {
        let n = MANAGER_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;

        Arc::new_cyclic(|weak: &Weak<AppManager>| Self {
            ctx: ctx.clone(),
            id: format!("AppManager-{}-{}", name, n),
            state: ReentrantMutex::new(RefCell::new(ManagerState::default())),
            worker: RwLock::new(None),
            add_object_slot: registration_slot(weak, "add_object", Self::add_object),
            remove_object_slot: registration_slot(weak, "remove_object", Self::remove_object),
            registry_worker: Mutex::new(None),
            deferred: AtomicUsize::new(0),
            self_ref: weak.clone(),
        })
    }

    /// Manager configured from settings, with its own worker if requested
    pub fn with_settings(
        ctx: &ServiceContext,
        name: &str,
        settings: &AppManagerSettings,
    ) -> ServiceResult<Arc<Self>> {
        let manager = Self::new(ctx, name);
        if settings.use_worker {
            manager.set_worker(Some(Worker::new(settings.worker_name.clone())?));
        }
        Ok(manager)
    }

    pub fn with_worker(self: Arc<Self>, worker: Worker) -> Arc<Self> {
        self.set_worker(Some(worker));
        self
    }

    /// Worker running the manager's slots and the services it adds
    pub fn set_worker(&self, worker: Option<Worker>) {
        self.add_object_slot.set_worker(worker.clone());
        self.remove_object_slot.set_worker(worker.clone());
        *self.worker.write() = worker;
    }

    pub fn worker(&self) -> Option<Worker> {
        self.worker.read().clone()
    }

    /// Process-unique id, also the prefix of generated input ids
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Setup and teardown
    // ------------------------------------------------------------------

    /// Follow the registry's output signals
    pub fn create(&self) -> ServiceResult<()> {
        self.exec(|mgr| {
            let _lock = mgr.state.lock();
            if !mgr.with_state(|s| s.registry_connections.is_empty()) {
                return Err(ServiceError::InvalidState(format!(
                    "[{}] create() called twice",
                    mgr.id
                )));
            }

            let added = mgr.ctx.osr.registered_signal().connect(&mgr.add_object_slot);
            let removed = mgr.ctx.osr.unregistered_signal().connect(&mgr.remove_object_slot);
            mgr.with_state(|s| {
                s.registry_connections.push(added);
                s.registry_connections.push(removed);
            });
            debug!("[{}] created", mgr.id);
            Ok(())
        })
    }

    /// Stop everything, stop following the registry and forget all objects
    /// and proxy connections
    ///
    /// If a service refuses to stop, the manager is left as is and the error
    /// returned; calling `destroy` again retries.
    pub fn destroy(&self) -> ServiceResult<()> {
        self.exec(|mgr| {
            let _lock = mgr.state.lock();
            mgr.do_stop_and_unregister_services()?;
            mgr.with_state(|s| {
                s.registry_connections.disconnect_all();
                s.proxies.clear();
            });

            while let Some((id, object)) = mgr.with_state(|s| {
                s.objects.iter().next().map(|(id, obj)| (id.clone(), *obj))
            }) {
                mgr.do_remove_object(object, &id);
            }
            debug!("[{}] destroyed", mgr.id);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------

    /// Build a service through the factory and manage it
    ///
    /// The service is not started here unless the manager is already started
    /// and the service's required objects are all present.
    pub fn add_service(
        &self,
        classname: &str,
        uid: &str,
        auto_start: bool,
        auto_update: bool,
    ) -> ServiceResult<Arc<ServiceInstance>> {
        let srv = self.ctx.add_service(classname, uid)?;
        self.add_service_instance(srv.clone(), auto_start, auto_update)?;
        Ok(srv)
    }

    /// Manage an already built service
    pub fn add_service_instance(
        &self,
        srv: Arc<ServiceInstance>,
        auto_start: bool,
        auto_update: bool,
    ) -> ServiceResult<()> {
        self.exec(move |mgr| {
            let _lock = mgr.state.lock();
            mgr.ctx.osr.register_service(&srv);
            if srv.worker().is_none() {
                srv.set_worker(mgr.worker());
            }
            mgr.internal_add_service(ServiceInfo {
                service: srv,
                auto_start,
                auto_update,
            });
            Ok(())
        })
    }

    fn internal_add_service(&self, info: ServiceInfo) {
        let srv = info.service.clone();
        self.with_state(|s| s.services.push(info.clone()));

        let objects: Vec<(String, ObjectHandle)> =
            self.with_state(|s| s.objects.iter().map(|(id, h)| (id.clone(), *h)).collect());
        for (id, object) in objects {
            if let Some(cfg) = srv.config_for_id(&id).filter(|c| c.access != Access::Output) {
                if let Err(e) =
                    srv.set_object(object, &cfg.key, cfg.access, cfg.auto_connect, cfg.optional)
                {
                    warn!("[{}] cannot bind '{}' on '{}': {}", self.id, id, srv.uid(), e);
                }
            }
        }

        let is_started = self.with_state(|s| s.is_started);
        if info.auto_start && is_started && srv.is_stopped() && srv.has_all_required_objects() {
            if self.start_info(&info).is_ok() && info.auto_update {
                self.update_logged(&srv);
            }
        }
    }

    /// Start a managed service; fails if its required objects are missing
    pub fn start_service(&self, srv: &Arc<ServiceInstance>) -> ServiceResult<()> {
        let srv = srv.clone();
        self.exec(move |mgr| {
            let _lock = mgr.state.lock();
            let info = mgr.service_info(&srv)?;

            let missing = srv.missing_objects();
            if !missing.is_empty() {
                return Err(ServiceError::MissingObjects {
                    uid: srv.uid().to_string(),
                    keys: missing,
                });
            }

            mgr.start_info(&info)?;
            if info.auto_update {
                srv.update().wait()??;
            }
            Ok(())
        })
    }

    /// Stop a managed service; no-op when it is not started
    pub fn stop_service(&self, srv: &Arc<ServiceInstance>) -> ServiceResult<()> {
        let srv = srv.clone();
        self.exec(move |mgr| {
            let _lock = mgr.state.lock();
            mgr.service_info(&srv)?;
            if mgr.is_tracked_started(&srv) {
                mgr.stop_srv(&srv)?;
            }
            Ok(())
        })
    }

    /// Start every auto-start service that can run, and keep doing so as
    /// objects arrive
    pub fn start_services(&self) -> ServiceResult<()> {
        self.exec(|mgr| {
            let _lock = mgr.state.lock();
            let services = mgr.with_state(|s| s.services.clone());

            let ready: Vec<ServiceInfo> = services
                .into_iter()
                .filter(|info| {
                    info.auto_start
                        && info.service.is_stopped()
                        && info.service.has_all_required_objects()
                })
                .collect();

            mgr.with_state(|s| s.is_started = true);
            mgr.start_and_update(&ready);
            info!("[{}] started {} service(s)", mgr.id, mgr.started_service_count());
            Ok(())
        })
    }

    /// Stop the started services and unregister all managed services
    ///
    /// Calling it again is a no-op. Services whose `stopping` hook fails stay
    /// started, registered and managed, and an error names them.
    pub fn stop_and_unregister_services(&self) -> ServiceResult<()> {
        self.exec(|mgr| mgr.do_stop_and_unregister_services())
    }

    fn do_stop_and_unregister_services(&self) -> ServiceResult<()> {
        let _lock = self.state.lock();

        let started = self.with_state(|s| s.started.clone());
        let mut still_started = Vec::new();
        for srv in started.iter().rev() {
            if let Err(e) = self.stop_srv(srv) {
                warn!("[{}] failed to stop '{}': {}", self.id, srv.uid(), e);
                still_started.push(srv.clone());
            }
        }

        let services = self.with_state(|s| {
            let (kept, removed): (Vec<ServiceInfo>, Vec<ServiceInfo>) =
                std::mem::take(&mut s.services)
                    .into_iter()
                    .partition(|info| {
                        still_started.iter().any(|srv| srv.id() == info.service.id())
                    });
            s.services = kept;
            s.is_started = false;
            removed
        });
        for info in &services {
            self.ctx.osr.unregister_service(&info.service);
        }
        if !services.is_empty() {
            debug!("[{}] {} service(s) unregistered", self.id, services.len());
        }

        if still_started.is_empty() {
            Ok(())
        } else {
            let uids: Vec<&str> = still_started.iter().map(|srv| srv.uid()).collect();
            Err(ServiceError::InvalidState(format!(
                "[{}] service(s) still started: {}",
                self.id,
                uids.join(", ")
            )))
        }
    }

    fn start_and_update(&self, ready: &[ServiceInfo]) {
        let mut to_update = Vec::new();
        for info in ready {
            if self.start_info(info).is_ok() && info.auto_update {
                to_update.push(info.service.clone());
            }
        }
        for srv in &to_update {
            self.update_logged(srv);
        }
    }

    fn start_info(&self, info: &ServiceInfo) -> ServiceResult<()> {
        let srv = &info.service;

        let proxies: Vec<ProxyConnections> = self.with_state(|s| {
            s.proxies
                .get(srv.uid())
                .map(|channels| channels.values().cloned().collect())
                .unwrap_or_default()
        });
        for cnx in proxies {
            srv.add_proxy_connection(cnx);
        }

        match srv.start().wait()? {
            Ok(()) => {
                self.with_state(|s| s.started.push(srv.clone()));
                Ok(())
            }
            Err(e) => {
                warn!("[{}] '{}' did not start: {}", self.id, srv.uid(), e);
                Err(e)
            }
        }
    }

    /// Stop `srv`; it stays tracked as started if its `stopping` hook fails
    fn stop_srv(&self, srv: &Arc<ServiceInstance>) -> ServiceResult<()> {
        srv.stop().wait()??;
        self.with_state(|s| s.started.retain(|other| other.id() != srv.id()));
        Ok(())
    }

    fn update_logged(&self, srv: &ServiceInstance) {
        match srv.update().wait() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[{}] update of '{}' failed: {}", self.id, srv.uid(), e),
            Err(e) => warn!("[{}] update of '{}' dropped: {}", self.id, srv.uid(), e),
        }
    }

    fn service_info(&self, srv: &ServiceInstance) -> ServiceResult<ServiceInfo> {
        self.with_state(|s| {
            s.services
                .iter()
                .find(|info| info.service.id() == srv.id())
                .cloned()
        })
        .ok_or_else(|| ServiceError::NotFound {
            resource: "Service".to_string(),
            id: srv.uid().to_string(),
        })
    }

    fn is_tracked_started(&self, srv: &ServiceInstance) -> bool {
        self.with_state(|s| s.started.iter().any(|other| other.id() == srv.id()))
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Make `object` available under logical `id`
    pub fn add_object(&self, object: ObjectHandle, id: &str) -> ServiceResult<()> {
        let id = id.to_string();
        self.exec(move |mgr| {
            mgr.do_add_object(object, &id);
            Ok(())
        })
    }

    fn do_add_object(&self, object: ObjectHandle, id: &str) {
        let _lock = self.state.lock();

        match self.with_state(|s| s.objects.get(id).copied()) {
            Some(current) if current == object => {
                warn!("[{}] object '{}' is already registered", self.id, id);
                return;
            }
            Some(current) => {
                warn!("[{}] object '{}' was not unregistered, removing it", self.id, id);
                self.do_remove_object(current, id);
            }
            None => {}
        }

        self.connect_object_proxies(object, id);

        let services = self.with_state(|s| s.services.clone());
        let mut ready = Vec::new();

        for info in services {
            let srv = &info.service;
            let Some(cfg) = srv.config_for_id(id).filter(|c| c.access != Access::Output) else {
                continue;
            };

            let registered = self.ctx.osr.get_registered(&cfg.key, cfg.access, srv);
            if registered != Some(object) {
                if srv.is_started() && !cfg.optional {
                    warn!("[{}] '{}' must be stopped to swap '{}'", self.id, srv.uid(), cfg.key);
                    if let Err(e) = self.stop_srv(srv) {
                        warn!(
                            "[{}] failed to stop '{}', '{}' not swapped: {}",
                            self.id,
                            srv.uid(),
                            cfg.key,
                            e
                        );
                        continue;
                    }
                }

                if registered.is_some() {
                    if let Err(e) = srv.unset_object(&cfg.key, cfg.access) {
                        warn!("[{}] cannot unbind '{}': {}", self.id, cfg.key, e);
                    }
                }

                if let Err(e) =
                    srv.set_object(object, &cfg.key, cfg.access, cfg.auto_connect, cfg.optional)
                {
                    warn!("[{}] cannot bind '{}' on '{}': {}", self.id, id, srv.uid(), e);
                    continue;
                }

                if cfg.optional && srv.is_started() {
                    self.swap_logged(srv, &cfg.key);
                }
            }

            if info.auto_start && srv.is_stopped() && srv.has_all_required_objects() {
                ready.push(info.clone());
            }
        }

        if self.with_state(|s| s.is_started) {
            self.start_and_update(&ready);
        }

        self.with_state(|s| s.objects.insert(id.to_string(), object));
        debug!("[{}] object '{}' added ({})", self.id, id, object);
    }

    /// Withdraw the object registered under `id`
    ///
    /// Services that need it are stopped; optional users are told through
    /// `swap_key`. Ignored if another object is now registered under `id`.
    pub fn remove_object(&self, object: ObjectHandle, id: &str) -> ServiceResult<()> {
        let id = id.to_string();
        self.exec(move |mgr| {
            mgr.do_remove_object(object, &id);
            Ok(())
        })
    }

    fn do_remove_object(&self, object: ObjectHandle, id: &str) {
        let _lock = self.state.lock();

        if let Some(current) = self.with_state(|s| s.objects.get(id).copied()) {
            if current != object {
                warn!(
                    "[{}] object '{}' is {}, not {}: removal ignored",
                    self.id, id, current, object
                );
                return;
            }
        }

        let services = self.with_state(|s| s.services.clone());
        for info in services {
            let srv = &info.service;
            let Some(cfg) = srv.config_for_id(id).filter(|c| c.access != Access::Output) else {
                continue;
            };
            if self.ctx.osr.get_registered(&cfg.key, cfg.access, srv) != Some(object) {
                continue;
            }

            if srv.is_started() && !cfg.optional {
                if let Err(e) = self.stop_srv(srv) {
                    warn!(
                        "[{}] failed to stop '{}', '{}' kept bound: {}",
                        self.id,
                        srv.uid(),
                        cfg.key,
                        e
                    );
                    continue;
                }
            }

            if let Err(e) = srv.unset_object(&cfg.key, cfg.access) {
                warn!("[{}] cannot unbind '{}': {}", self.id, cfg.key, e);
            }

            if cfg.optional && srv.is_started() {
                self.swap_logged(srv, &cfg.key);
            }
        }

        self.disconnect_object_proxies(object, id);
        self.with_state(|s| s.objects.remove(id));
        debug!("[{}] object '{}' removed", self.id, id);
    }

    fn swap_logged(&self, srv: &ServiceInstance, key: &str) {
        match srv.swap_key(key).wait() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[{}] swap of '{}' failed: {}", self.id, key, e),
            Err(e) => warn!("[{}] swap of '{}' dropped: {}", self.id, key, e),
        }
    }

    /// Object registered under `id`
    pub fn get_object(&self, id: &str) -> Option<ObjectHandle> {
        let _lock = self.state.lock();
        self.with_state(|s| s.objects.get(id).copied())
    }

    fn object_proxies(&self, id: &str) -> Vec<ProxyConnections> {
        self.with_state(|s| {
            s.proxies
                .get(id)
                .map(|channels| channels.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn connect_object_proxies(&self, object: ObjectHandle, id: &str) {
        let proxies = self.object_proxies(id);
        if proxies.is_empty() {
            return;
        }
        let Some(obj) = self.ctx.arena.get(object) else {
            return;
        };

        for cnx in &proxies {
            for (_, key) in &cnx.signals {
                match obj.signals().get_any(key) {
                    Some(signal) => self.ctx.proxy.connect_signal(&cnx.channel, signal),
                    None => warn!("[{}] object '{}' has no signal '{}'", self.id, id, key),
                }
            }
        }
    }

    fn disconnect_object_proxies(&self, object: ObjectHandle, id: &str) {
        let Some(obj) = self.ctx.arena.get(object) else {
            return;
        };

        for cnx in &self.object_proxies(id) {
            for (_, key) in &cnx.signals {
                if let Some(signal) = obj.signals().get_any(key) {
                    self.ctx.proxy.disconnect_signal(&cnx.channel, &signal);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Proxy connections
    // ------------------------------------------------------------------

    /// Record channel wiring, made when the services (or objects) involved
    /// appear
    ///
    /// An undefined channel gets a generated name, which is returned.
    pub fn add_proxy_connection(&self, proxy: ProxyConnections) -> String {
        let _lock = self.state.lock();

        let channel = if proxy.has_undefined_channel() {
            let n = CHANNEL_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("AppManager_channel_{}", n)
        } else {
            proxy.channel.clone()
        };

        self.with_state(|s| {
            for (uid, key) in &proxy.signals {
                s.proxies
                    .entry(uid.clone())
                    .or_default()
                    .entry(channel.clone())
                    .or_insert_with(|| ProxyConnections::new(channel.clone()))
                    .add_signal_connection(uid.clone(), key.clone());
            }
            for (uid, key) in &proxy.slots {
                s.proxies
                    .entry(uid.clone())
                    .or_default()
                    .entry(channel.clone())
                    .or_insert_with(|| ProxyConnections::new(channel.clone()))
                    .add_slot_connection(uid.clone(), key.clone());
            }
        });

        channel
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Declare an input; a non-empty default makes it optional
    pub fn require_input(&self, key: &str, input_type: InputType, default_value: &str) {
        self.insert_input(Input {
            key: key.to_string(),
            input_type,
            value: String::new(),
            default_value: default_value.to_string(),
            optional: !default_value.is_empty(),
        });
    }

    /// Declare an input that may stay unresolved
    pub fn require_optional_input(&self, key: &str, input_type: InputType) {
        self.insert_input(Input {
            key: key.to_string(),
            input_type,
            value: String::new(),
            default_value: String::new(),
            optional: true,
        });
    }

    fn insert_input(&self, input: Input) {
        let _lock = self.state.lock();
        self.with_state(|s| s.inputs.insert(input.key.clone(), input));
    }

    /// Set the value of a declared input; unknown keys are ignored
    pub fn replace_input(&self, key: &str, value: &str) {
        let _lock = self.state.lock();
        let found = self.with_state(|s| match s.inputs.get_mut(key) {
            Some(input) => {
                input.value = value.to_string();
                true
            }
            None => false,
        });
        if !found {
            debug!("[{}] no input '{}' to replace", self.id, key);
        }
    }

    pub fn inputs(&self) -> Vec<Input> {
        let _lock = self.state.lock();
        self.with_state(|s| s.inputs.values().cloned().collect())
    }

    /// Identifier an input resolves to: its value when set, otherwise an id
    /// scoped to this manager
    pub fn get_input_id(&self, key: &str) -> String {
        let _lock = self.state.lock();
        self.with_state(|s| {
            s.inputs
                .get(key)
                .map(|input| input.value.clone())
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_else(|| format!("{}-{}", self.id, key))
    }

    /// True when every mandatory input is resolved
    ///
    /// Object inputs naming a live object register it; unresolved object
    /// inputs with a default classname get a new object of that class.
    pub fn check_inputs(&self) -> bool {
        let outcome = self.exec(|mgr| Ok(mgr.do_check_inputs()));
        outcome.unwrap_or_else(|e| {
            warn!("[{}] input check failed: {}", self.id, e);
            false
        })
    }

    fn do_check_inputs(&self) -> bool {
        let _lock = self.state.lock();
        let inputs = self.with_state(|s| s.inputs.values().cloned().collect::<Vec<_>>());
        let mut ok = true;

        for input in inputs {
            match input.input_type {
                InputType::Object => {
                    if !self.resolve_object_input(&input) {
                        debug!("[{}] missing input for '{}'", self.id, input.key);
                        ok = false;
                    }
                }
                InputType::Channel | InputType::Other => {
                    if input.value.is_empty() && !input.optional {
                        debug!("[{}] missing input '{}'", self.id, input.key);
                        ok = false;
                    }
                }
            }
        }

        ok
    }

    fn resolve_object_input(&self, input: &Input) -> bool {
        if !input.value.is_empty() {
            if let Some(handle) = self.ctx.arena.find(&input.value) {
                if self.with_state(|s| s.objects.get(&input.value) != Some(&handle)) {
                    self.do_add_object(handle, &input.value);
                }
            }
            return true;
        }

        let id = self.get_input_id(&input.key);
        if self.with_state(|s| s.objects.contains_key(&id)) {
            return true;
        }

        if !input.default_value.is_empty() {
            let created = self
                .ctx
                .data
                .create(&input.default_value)
                .and_then(|object| self.ctx.arena.insert(object));
            return match created {
                Ok(handle) => {
                    self.do_add_object(handle, &id);
                    true
                }
                Err(e) => {
                    warn!("[{}] cannot create default for '{}': {}", self.id, input.key, e);
                    false
                }
            };
        }

        input.optional
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Build and start an application from its declarative description
    pub fn launch(&self, app: &AppConfig) -> ServiceResult<()> {
        for input in &app.inputs {
            let input_type: InputType = input.input_type.parse().map_err(ServiceError::Config)?;
            match &input.default {
                Some(default) if !default.is_empty() => {
                    self.require_input(&input.key, input_type, default)
                }
                _ if input.optional => self.require_optional_input(&input.key, input_type),
                _ => self.require_input(&input.key, input_type, ""),
            }
            if let Some(value) = &input.value {
                self.replace_input(&input.key, value);
            }
        }

        for cnx in &app.connections {
            let channel = cnx
                .channel
                .as_deref()
                .map(|c| self.resolve_id(c))
                .unwrap_or_else(|| ProxyConnections::UNDEFINED_CHANNEL.to_string());
            let mut proxy = ProxyConnections::new(channel);
            for endpoint in &cnx.signals {
                proxy.add_signal_connection(self.resolve_id(&endpoint.uid), endpoint.key.clone());
            }
            for endpoint in &cnx.slots {
                proxy.add_slot_connection(self.resolve_id(&endpoint.uid), endpoint.key.clone());
            }
            self.add_proxy_connection(proxy);
        }

        if !self.check_inputs() {
            return Err(ServiceError::Config(format!(
                "[{}] required inputs are missing",
                self.id
            )));
        }

        if self.with_state(|s| s.registry_connections.is_empty()) {
            self.create()?;
        }

        for cfg in &app.services {
            let srv = self.ctx.add_service(&cfg.service_type, &cfg.uid)?;
            for obj in &cfg.objects {
                let access: Access = obj.access.parse().map_err(ServiceError::Config)?;
                srv.register_object(
                    &self.resolve_id(&obj.id),
                    &obj.key,
                    access,
                    obj.auto_connect,
                    obj.optional,
                );
            }
            srv.configure()?;
            self.add_service_instance(srv, cfg.auto_start, cfg.auto_update)?;
        }

        self.start_services()
    }

    /// Input ids resolve through the inputs, anything else is used as-is
    fn resolve_id(&self, name: &str) -> String {
        let _lock = self.state.lock();
        if self.with_state(|s| s.inputs.contains_key(name)) {
            self.get_input_id(name)
        } else {
            name.to_string()
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn service_count(&self) -> usize {
        let _lock = self.state.lock();
        self.with_state(|s| s.services.len())
    }

    pub fn started_service_count(&self) -> usize {
        let _lock = self.state.lock();
        self.with_state(|s| s.started.len())
    }

    pub fn is_started(&self) -> bool {
        let _lock = self.state.lock();
        self.with_state(|s| s.is_started)
    }

    pub fn services(&self) -> Vec<Arc<ServiceInstance>> {
        let _lock = self.state.lock();
        self.with_state(|s| s.services.iter().map(|info| info.service.clone()).collect())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Short borrow of the state; never call out while holding it
    fn with_state<R>(&self, f: impl FnOnce(&mut ManagerState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Run `f` on the manager's worker, inline when there is none or when
    /// already on it
    ///
    /// Registry events deferred meanwhile are processed before returning.
    fn exec<T, F>(&self, f: F) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AppManager) -> ServiceResult<T> + Send + 'static,
    {
        let result = match self.worker() {
            Some(worker) if !worker.is_current_thread() => {
                let manager = self.self_ref.upgrade().ok_or_else(|| {
                    ServiceError::InvalidState(format!("[{}] manager is being dropped", self.id))
                })?;
                worker.post_task(move || f(&manager)).wait()?
            }
            _ => f(self),
        };
        self.flush_deferred();
        result
    }

    /// Handle a registry event now if the state is free (or ours), defer it
    /// otherwise
    fn dispatch_registration(
        &self,
        name: &str,
        action: RegistryAction,
        object: ObjectHandle,
        id: String,
    ) {
        // The manager's own worker already serializes everything
        if self.worker().is_some() {
            if let Err(e) = action(self, object, &id) {
                warn!("[{}] {} slot: {}", self.id, name, e);
            }
            return;
        }

        // Keep order behind events already deferred
        if self.deferred.load(Ordering::Acquire) == 0 {
            if let Some(_lock) = self.state.try_lock() {
                if let Err(e) = action(self, object, &id) {
                    warn!("[{}] {} slot: {}", self.id, name, e);
                }
                return;
            }
        }

        let (Some(manager), Ok(worker)) = (self.self_ref.upgrade(), self.registry_worker()) else {
            warn!("[{}] {} slot: cannot defer event for '{}'", self.id, name, id);
            return;
        };
        debug!("[{}] {} '{}' deferred", self.id, name, id);

        let name = name.to_string();
        self.deferred.fetch_add(1, Ordering::AcqRel);
        let posted = worker.post(move || {
            if let Err(e) = action(&manager, object, &id) {
                warn!("[{}] {} slot: {}", manager.id, name, e);
            }
            manager.deferred.fetch_sub(1, Ordering::AcqRel);
        });
        if let Err(e) = posted {
            self.deferred.fetch_sub(1, Ordering::AcqRel);
            warn!("[{}] registry worker unavailable: {}", self.id, e);
        }
    }

    fn registry_worker(&self) -> ServiceResult<Worker> {
        let mut slot = self.registry_worker.lock();
        if let Some(worker) = slot.as_ref() {
            return Ok(worker.clone());
        }
        let worker = Worker::new(format!("{}-registry", self.id))?;
        *slot = Some(worker.clone());
        Ok(worker)
    }

    /// Wait for deferred registry events, unless called from inside the
    /// manager (the events need the state this thread holds)
    fn flush_deferred(&self) {
        if self.state.is_owned_by_current_thread() {
            return;
        }
        let Some(worker) = self.registry_worker.lock().clone() else {
            return;
        };
        if worker.is_current_thread() {
            return;
        }
        while self.deferred.load(Ordering::Acquire) > 0 {
            if worker.post_task(|| ()).wait().is_err() {
                break;
            }
        }
    }
}

impl fmt::Debug for AppManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppManager")
            .field("id", &self.id)
            .field("services", &self.service_count())
            .field("started", &self.is_started())
            .finish()
    }
}

fn registration_slot(
    weak: &Weak<AppManager>,
    name: &'static str,
    action: RegistryAction,
) -> Slot<RegistrationEvent> {
    let weak = weak.clone();
    Slot::new(move |event: RegistrationEvent| {
        let Some(manager) = weak.upgrade() else {
            return;
        };
        // Outputs without a declared id are not followed
        let Some(id) = event.id else {
            return;
        };
        manager.dispatch_registration(name, action, event.object, id);
    })
}
