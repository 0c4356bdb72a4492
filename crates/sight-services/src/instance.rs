// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Running service: lifecycle state, object bindings, signals and slots.

Lifecycle calls (`start`, `stop`, `update`, `swap_key`) run inline when the
service has no worker or when called from its worker thread, and are queued
on the worker otherwise. Each returns a [`TaskFuture`] carrying the hook's
result.

```text
 STOPPED ──start──→ STARTING ──ok──→ STARTED ──stop──→ STOPPING ──ok──→ STOPPED
                        │                │  ↑
                        └──err──→ STOPPED │  └── SWAPPING ←── swap_key
```
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use sight_com::{ConnectionSet, Proxy, Signals, Slot, Slots, TaskFuture, Worker};
use sight_data::{Object, ObjectArena, ObjectHandle};
use tracing::{debug, error, warn};

use crate::context::ServiceContext;
use crate::registry::{ObjectService, ProxyConnections};
use crate::traits::Service;
use crate::types::{
    Access, NotificationType, ObjectServiceConfig, ServiceError, ServiceId, ServiceResult,
    ServiceState,
};

pub struct ServiceInstance {
    id: ServiceId,
    uid: String,
    service: Box<dyn Service>,
    osr: Weak<ObjectService>,
    arena: Arc<ObjectArena>,
    proxy: Arc<Proxy>,
    state: RwLock<ServiceState>,
    updating: AtomicBool,
    configs: RwLock<Vec<ObjectServiceConfig>>,
    objects: RwLock<AHashMap<(String, Access), ObjectHandle>>,
    proxies: Mutex<AHashMap<String, ProxyConnections>>,
    auto_connections: Mutex<ConnectionSet>,
    signals: Signals,
    slots: Slots,
    self_ref: Weak<ServiceInstance>,
}

impl ServiceInstance {
    pub const STARTED_SIG: &'static str = "started";
    pub const UPDATED_SIG: &'static str = "updated";
    pub const SWAPPED_SIG: &'static str = "swapped";
    pub const STOPPED_SIG: &'static str = "stopped";
    pub const INFO_NOTIFIED_SIG: &'static str = "info_notified";
    pub const SUCCESS_NOTIFIED_SIG: &'static str = "success_notified";
    pub const FAILURE_NOTIFIED_SIG: &'static str = "failure_notified";

    pub const START_SLOT: &'static str = "start";
    pub const STOP_SLOT: &'static str = "stop";
    pub const UPDATE_SLOT: &'static str = "update";
    pub const SWAP_KEY_SLOT: &'static str = "swap_key";

    /// Wrap a service implementation; the instance starts `Stopped`
    pub fn new(ctx: &ServiceContext, service: Box<dyn Service>, uid: impl Into<String>) -> Arc<Self> {
        let uid = uid.into();

        Arc::new_cyclic(|weak: &Weak<ServiceInstance>| {
            let signals = Signals::new();
            signals.new_signal::<()>(Self::STARTED_SIG);
            signals.new_signal::<()>(Self::UPDATED_SIG);
            signals.new_signal::<()>(Self::SWAPPED_SIG);
            signals.new_signal::<()>(Self::STOPPED_SIG);
            signals.new_signal::<String>(Self::INFO_NOTIFIED_SIG);
            signals.new_signal::<String>(Self::SUCCESS_NOTIFIED_SIG);
            signals.new_signal::<String>(Self::FAILURE_NOTIFIED_SIG);

            let slots = Slots::new();
            slots.insert(Self::START_SLOT, lifecycle_slot(weak, "start", Self::do_start));
            slots.insert(Self::STOP_SLOT, lifecycle_slot(weak, "stop", Self::do_stop));
            slots.insert(Self::UPDATE_SLOT, lifecycle_slot(weak, "update", Self::do_update));

            let w = weak.clone();
            slots.insert(
                Self::SWAP_KEY_SLOT,
                Slot::new(move |key: String| {
                    if let Some(srv) = w.upgrade() {
                        if let Err(e) = srv.do_swap_key(&key) {
                            warn!("[{}] swap_key slot: {}", srv.uid, e);
                        }
                    }
                }),
            );

            service.init_com(&signals, &slots);

            Self {
                id: ServiceId::next(),
                uid,
                service,
                osr: Arc::downgrade(&ctx.osr),
                arena: ctx.arena.clone(),
                proxy: ctx.proxy.clone(),
                state: RwLock::new(ServiceState::Stopped),
                updating: AtomicBool::new(false),
                configs: RwLock::new(Vec::new()),
                objects: RwLock::new(AHashMap::new()),
                proxies: Mutex::new(AHashMap::new()),
                auto_connections: Mutex::new(ConnectionSet::new()),
                signals,
                slots,
                self_ref: weak.clone(),
            }
        })
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn classname(&self) -> &'static str {
        self.service.classname()
    }

    pub fn service(&self) -> &dyn Service {
        self.service.as_ref()
    }

    /// Typed access to the wrapped implementation
    pub fn service_as<T: Service>(&self) -> Option<&T> {
        self.service.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Service>(&self) -> bool {
        self.service.as_any().is::<T>()
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    pub fn is_started(&self) -> bool {
        self.state() == ServiceState::Started
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ServiceState::Stopped
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn worker(&self) -> Option<Worker> {
        self.slots.worker()
    }

    /// Bind lifecycle calls and every slot to a worker
    pub fn set_worker(&self, worker: Option<Worker>) {
        self.slots.set_worker(worker);
    }

    // ------------------------------------------------------------------
    // Object bindings
    // ------------------------------------------------------------------

    /// Declare that `key` is bound to the object known under logical `id`
    pub fn register_object(
        &self,
        id: &str,
        key: &str,
        access: Access,
        auto_connect: bool,
        optional: bool,
    ) {
        self.declare(key, access, auto_connect, optional);
        if let Some(cfg) = self.configs.write().iter_mut().find(|c| c.key == key) {
            cfg.id = Some(id.to_string());
        }
    }

    fn declare(&self, key: &str, access: Access, auto_connect: bool, optional: bool) {
        let mut configs = self.configs.write();
        match configs.iter_mut().find(|c| c.key == key) {
            Some(cfg) => {
                cfg.access = access;
                cfg.auto_connect = auto_connect;
                cfg.optional = optional;
            }
            None => configs.push(ObjectServiceConfig {
                id: None,
                key: key.to_string(),
                access,
                auto_connect,
                optional,
            }),
        }
    }

    pub fn object_configs(&self) -> Vec<ObjectServiceConfig> {
        self.configs.read().clone()
    }

    /// Configuration of the key bound to logical object `id`
    pub fn config_for_id(&self, id: &str) -> Option<ObjectServiceConfig> {
        self.configs
            .read()
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
            .cloned()
    }

    /// Logical object id declared for `key`
    pub fn object_id(&self, key: &str) -> Option<String> {
        self.configs
            .read()
            .iter()
            .find(|c| c.key == key)
            .and_then(|c| c.id.clone())
    }

    /// Bind an object under `key` through the registry
    pub fn set_object(
        &self,
        object: ObjectHandle,
        key: &str,
        access: Access,
        auto_connect: bool,
        optional: bool,
    ) -> ServiceResult<()> {
        self.declare(key, access, auto_connect, optional);
        self.osr()?
            .register_service_keyed(object, key, access, &self.arc()?)?;
        Ok(())
    }

    /// Remove the binding under `key`
    pub fn unset_object(&self, key: &str, access: Access) -> ServiceResult<()> {
        self.osr()?.unregister_service_keyed(key, access, self)?;
        Ok(())
    }

    /// Publish (or retract with `None`) the object produced under `key`
    ///
    /// Goes through the registry's output path so that observers of the
    /// `registered`/`unregistered` signals learn about it.
    pub fn set_output(&self, key: &str, object: Option<ObjectHandle>) -> ServiceResult<()> {
        let osr = self.osr()?;

        if osr.is_registered(key, Access::Output, self) {
            osr.unregister_service_output(key, self)?;
        }

        if let Some(object) = object {
            osr.register_service_output(object, key, &self.arc()?)?;
        }

        Ok(())
    }

    /// Mirror of the registry associations; only the registry writes it
    pub(crate) fn cache_binding(&self, key: &str, access: Access, object: Option<ObjectHandle>) {
        let mut objects = self.objects.write();
        match object {
            Some(object) => objects.insert((key.to_string(), access), object),
            None => objects.remove(&(key.to_string(), access)),
        };
    }

    pub fn object_handle(&self, key: &str, access: Access) -> Option<ObjectHandle> {
        self.objects.read().get(&(key.to_string(), access)).copied()
    }

    /// Bound object, if still alive
    pub fn object(&self, key: &str, access: Access) -> Option<Arc<Object>> {
        self.object_handle(key, access)
            .and_then(|handle| self.arena.get(handle))
    }

    pub fn input(&self, key: &str) -> Option<Arc<Object>> {
        self.object(key, Access::Input)
    }

    pub fn inout(&self, key: &str) -> Option<Arc<Object>> {
        self.object(key, Access::InOut)
    }

    /// Keys of mandatory input/inout objects that are not bound
    pub fn missing_objects(&self) -> Vec<String> {
        let objects = self.objects.read();
        self.configs
            .read()
            .iter()
            .filter(|c| !c.optional && c.access != Access::Output)
            .filter(|c| !objects.contains_key(&(c.key.clone(), c.access)))
            .map(|c| c.key.clone())
            .collect()
    }

    pub fn has_all_required_objects(&self) -> bool {
        let missing = self.missing_objects();
        if !missing.is_empty() {
            debug!("[{}] missing objects: {:?}", self.uid, missing);
        }
        missing.is_empty()
    }

    fn has_registered_outputs(&self) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter(|(_, access)| *access == Access::Output)
            .map(|(key, _)| key.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Proxies
    // ------------------------------------------------------------------

    /// Channel wiring established at start and removed at stop
    pub fn add_proxy_connection(&self, connections: ProxyConnections) {
        self.proxies
            .lock()
            .insert(connections.channel.clone(), connections);
    }

    pub fn proxy_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.proxies.lock().keys().cloned().collect();
        channels.sort();
        channels
    }

    fn connect_proxies(&self) {
        let proxies: Vec<ProxyConnections> = self.proxies.lock().values().cloned().collect();

        for cfg in &proxies {
            for (uid, key) in cfg.signals.iter().filter(|(uid, _)| *uid == self.uid) {
                match self.signals.get_any(key) {
                    Some(signal) => self.proxy.connect_signal(&cfg.channel, signal),
                    None => error!(
                        "Signal '{}' not found in '{}', cannot join channel '{}'",
                        key, uid, cfg.channel
                    ),
                }
            }
            for (uid, key) in cfg.slots.iter().filter(|(uid, _)| *uid == self.uid) {
                match self.slots.get_any(key) {
                    Some(slot) => self.proxy.connect_slot(&cfg.channel, slot),
                    None => error!(
                        "Slot '{}' not found in '{}', cannot join channel '{}'",
                        key, uid, cfg.channel
                    ),
                }
            }
        }
    }

    fn disconnect_proxies(&self) {
        let proxies: Vec<ProxyConnections> = self.proxies.lock().values().cloned().collect();

        for cfg in &proxies {
            for (_, key) in cfg.signals.iter().filter(|(uid, _)| *uid == self.uid) {
                if let Some(signal) = self.signals.get_any(key) {
                    self.proxy.disconnect_signal(&cfg.channel, &signal);
                }
            }
            for (_, key) in cfg.slots.iter().filter(|(uid, _)| *uid == self.uid) {
                if let Some(slot) = self.slots.get_any(key) {
                    self.proxy.disconnect_slot(&cfg.channel, &slot);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Auto-connections
    // ------------------------------------------------------------------

    fn auto_connect(&self) {
        let configs: Vec<ObjectServiceConfig> = self
            .configs
            .read()
            .iter()
            .filter(|c| c.auto_connect)
            .cloned()
            .collect();
        if configs.is_empty() {
            return;
        }

        let connections = self.service.auto_connections();
        let mut set = self.auto_connections.lock();

        for cfg in configs {
            let Some(object) = self.object(&cfg.key, cfg.access) else {
                if !cfg.optional {
                    warn!("[{}] object '{}' not found for auto-connection", self.uid, cfg.key);
                }
                continue;
            };

            let pairs = connections.get(&cfg.key).cloned().unwrap_or_else(|| {
                vec![(Object::MODIFIED_SIG.to_string(), Self::UPDATE_SLOT.to_string())]
            });

            for (signal_key, slot_key) in pairs {
                let signal = object.signals().get_any(&signal_key);
                let slot = self.slots.get_any(&slot_key);
                match (signal, slot) {
                    (Some(signal), Some(slot)) => match signal.connect_any(slot.as_ref()) {
                        Ok(connection) => set.push(connection),
                        Err(e) => warn!("[{}] auto-connection '{}': {}", self.uid, cfg.key, e),
                    },
                    _ => warn!(
                        "[{}] auto-connection '{}': no '{}' -> '{}'",
                        self.uid, cfg.key, signal_key, slot_key
                    ),
                }
            }
        }
    }

    fn auto_disconnect(&self) {
        self.auto_connections.lock().disconnect_all();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Run the `configuring` hook
    pub fn configure(&self) -> ServiceResult<()> {
        self.service
            .configuring(self)
            .map_err(|e| self.hook_failed("configuring", e))
    }

    pub fn start(&self) -> TaskFuture<ServiceResult<()>> {
        self.dispatch(|srv| srv.do_start())
    }

    pub fn stop(&self) -> TaskFuture<ServiceResult<()>> {
        self.dispatch(|srv| srv.do_stop())
    }

    pub fn update(&self) -> TaskFuture<ServiceResult<()>> {
        self.dispatch(|srv| srv.do_update())
    }

    /// Notify a started service that the object under `key` changed
    pub fn swap_key(&self, key: &str) -> TaskFuture<ServiceResult<()>> {
        let key = key.to_string();
        self.dispatch(move |srv| srv.do_swap_key(&key))
    }

    fn dispatch<F>(&self, f: F) -> TaskFuture<ServiceResult<()>>
    where
        F: FnOnce(&ServiceInstance) -> ServiceResult<()> + Send + 'static,
    {
        match self.worker() {
            Some(worker) if !worker.is_current_thread() => match self.self_ref.upgrade() {
                Some(srv) => worker.post_task(move || f(&srv)),
                None => TaskFuture::ready(Err(self.dropped())),
            },
            _ => TaskFuture::ready(f(self)),
        }
    }

    fn do_start(&self) -> ServiceResult<()> {
        self.transition(ServiceState::Stopped, ServiceState::Starting, "start")?;
        self.connect_proxies();

        if let Err(e) = self.service.starting(self) {
            error!("Error while STARTING service '{}': {}", self.uid, e);
            error!("Service '{}' is still STOPPED", self.uid);
            *self.state.write() = ServiceState::Stopped;
            self.disconnect_proxies();
            return Err(self.hook_failed("starting", e));
        }

        *self.state.write() = ServiceState::Started;
        self.auto_connect();
        debug!("Service '{}' started", self.uid);
        self.emit(Self::STARTED_SIG);
        Ok(())
    }

    fn do_stop(&self) -> ServiceResult<()> {
        self.transition(ServiceState::Started, ServiceState::Stopping, "stop")?;
        self.auto_disconnect();

        if let Err(e) = self.service.stopping(self) {
            error!("Error while STOPPING service '{}': {}", self.uid, e);
            error!("Service '{}' is still STARTED", self.uid);
            *self.state.write() = ServiceState::Started;
            self.auto_connect();
            return Err(self.hook_failed("stopping", e));
        }

        *self.state.write() = ServiceState::Stopped;
        debug!("Service '{}' stopped", self.uid);
        self.emit(Self::STOPPED_SIG);
        self.disconnect_proxies();

        let outputs = self.has_registered_outputs();
        if !outputs.is_empty() {
            warn!(
                "Service '{}' still has registered outputs {:?}; call set_output(key, None) while stopping",
                self.uid, outputs
            );
        }
        Ok(())
    }

    fn do_update(&self) -> ServiceResult<()> {
        let state = self.state();
        if state != ServiceState::Started {
            warn!(
                "Update invoked on service '{}' ({}) while {}: discarded",
                self.uid,
                self.classname(),
                state
            );
            return Err(ServiceError::InvalidState(format!(
                "service '{}' is {}, cannot update",
                self.uid, state
            )));
        }

        if self.updating.swap(true, Ordering::AcqRel) {
            return Err(ServiceError::InvalidState(format!(
                "service '{}' is already updating",
                self.uid
            )));
        }

        let result = self.service.updating(self);
        self.updating.store(false, Ordering::Release);

        match result {
            Ok(()) => {
                self.emit(Self::UPDATED_SIG);
                Ok(())
            }
            Err(e) => {
                error!("Error while UPDATING service '{}': {}", self.uid, e);
                Err(self.hook_failed("updating", e))
            }
        }
    }

    fn do_swap_key(&self, key: &str) -> ServiceResult<()> {
        self.transition(ServiceState::Started, ServiceState::Swapping, "swap")?;
        self.auto_disconnect();

        let result = self.service.swapping(self, key);
        *self.state.write() = ServiceState::Started;

        if let Err(e) = result {
            error!("Error while SWAPPING service '{}': {}", self.uid, e);
            return Err(self.hook_failed("swapping", e));
        }

        self.auto_connect();
        self.emit(Self::SWAPPED_SIG);
        Ok(())
    }

    fn transition(
        &self,
        from: ServiceState,
        to: ServiceState,
        action: &str,
    ) -> ServiceResult<()> {
        let mut state = self.state.write();
        if *state != from {
            return Err(ServiceError::InvalidState(format!(
                "cannot {} service '{}' while {}",
                action, self.uid, *state
            )));
        }
        *state = to;
        Ok(())
    }

    fn emit(&self, key: &str) {
        if let Some(signal) = self.signals.get::<()>(key) {
            signal.emit(());
        }
    }

    /// Emit the notification signal matching `kind`
    pub fn notify(&self, kind: NotificationType, message: impl Into<String>) {
        let key = match kind {
            NotificationType::Info => Self::INFO_NOTIFIED_SIG,
            NotificationType::Success => Self::SUCCESS_NOTIFIED_SIG,
            NotificationType::Failure => Self::FAILURE_NOTIFIED_SIG,
        };
        if let Some(signal) = self.signals.get::<String>(key) {
            signal.emit(message.into());
        }
    }

    fn hook_failed(&self, hook: &'static str, e: ServiceError) -> ServiceError {
        ServiceError::HookFailed {
            uid: self.uid.clone(),
            hook,
            reason: e.to_string(),
        }
    }

    fn osr(&self) -> ServiceResult<Arc<ObjectService>> {
        self.osr.upgrade().ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "object service dropped while service '{}' is alive",
                self.uid
            ))
        })
    }

    fn arc(&self) -> ServiceResult<Arc<ServiceInstance>> {
        self.self_ref.upgrade().ok_or_else(|| self.dropped())
    }

    fn dropped(&self) -> ServiceError {
        ServiceError::InvalidState(format!("service '{}' is being dropped", self.uid))
    }
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("id", &self.id)
            .field("uid", &self.uid)
            .field("classname", &self.classname())
            .field("state", &self.state())
            .finish()
    }
}

fn lifecycle_slot(
    weak: &Weak<ServiceInstance>,
    name: &'static str,
    action: fn(&ServiceInstance) -> ServiceResult<()>,
) -> Slot<()> {
    let weak = weak.clone();
    Slot::new(move |_: ()| {
        if let Some(srv) = weak.upgrade() {
            if let Err(e) = action(&srv) {
                warn!("[{}] {} slot: {}", srv.uid, name, e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorder, RecorderService};
    use sight_data::Integer;

    fn setup() -> (ServiceContext, Arc<ServiceInstance>) {
        let ctx = ServiceContext::new();
        let srv = ctx.wrap_service(RecorderService::default(), "recorder");
        (ctx, srv)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (_ctx, srv) = setup();
        assert!(srv.is_stopped());

        srv.start().wait().unwrap().unwrap();
        assert!(srv.is_started());
        assert!(matches!(
            srv.start().wait().unwrap(),
            Err(ServiceError::InvalidState(_))
        ));

        srv.update().wait().unwrap().unwrap();
        srv.stop().wait().unwrap().unwrap();
        assert!(srv.is_stopped());
        assert!(srv.stop().wait().unwrap().is_err());
        assert!(srv.update().wait().unwrap().is_err());

        let rec = srv.service_as::<RecorderService>().unwrap();
        assert_eq!(rec.calls(), vec!["starting", "updating", "stopping"]);
    }

    #[test]
    fn test_failing_start_leaves_service_stopped() {
        let ctx = ServiceContext::new();
        let srv = ctx.wrap_service(RecorderService::failing_start(), "broken");

        let err = srv.start().wait().unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::HookFailed { hook: "starting", .. }));
        assert!(srv.is_stopped());
    }

    #[test]
    fn test_required_objects() {
        let (ctx, srv) = setup();
        srv.register_object("img", "image", Access::InOut, false, false);
        srv.register_object("mask", "mask", Access::Input, false, true);
        srv.register_object("out", "result", Access::Output, false, false);
        assert_eq!(srv.missing_objects(), vec!["image".to_string()]);
        assert!(!srv.has_all_required_objects());

        let h = ctx.arena.create(Integer(1)).unwrap();
        srv.set_object(h, "image", Access::InOut, false, false).unwrap();
        assert!(srv.has_all_required_objects());
        assert_eq!(srv.object_handle("image", Access::InOut), Some(h));
        assert_eq!(srv.config_for_id("img").unwrap().key, "image");
        assert_eq!(srv.object_id("result").as_deref(), Some("out"));

        srv.unset_object("image", Access::InOut).unwrap();
        assert!(!srv.has_all_required_objects());
        assert!(srv.unset_object("image", Access::InOut).is_err());
    }

    #[test]
    fn test_auto_connection_updates_on_modified() {
        let (ctx, srv) = setup();
        let h = ctx.arena.create(Integer(1)).unwrap();
        srv.set_object(h, "value", Access::Input, true, false).unwrap();
        srv.start().wait().unwrap().unwrap();

        let object = ctx.arena.get(h).unwrap();
        assert_eq!(object.notify_modified(), 1);
        srv.stop().wait().unwrap().unwrap();
        assert_eq!(object.notify_modified(), 0);

        let rec = srv.service_as::<RecorderService>().unwrap();
        assert_eq!(rec.count("updating"), 1);
    }

    #[test]
    fn test_lifecycle_on_worker() {
        let (_ctx, srv) = setup();
        let worker = Worker::new("srv-worker").unwrap();
        srv.set_worker(Some(worker.clone()));

        srv.start().wait().unwrap().unwrap();
        srv.update().wait().unwrap().unwrap();

        let rec = srv.service_as::<RecorderService>().unwrap();
        assert!(rec.threads().iter().all(|name| name.as_deref() == Some("srv-worker")));
        srv.stop().wait().unwrap().unwrap();
        worker.stop();
    }

    #[test]
    fn test_slots_and_notifications() {
        let (_ctx, srv) = setup();
        let recorder = Recorder::default();
        let slot = recorder.string_slot();
        srv.signals()
            .get::<String>(ServiceInstance::FAILURE_NOTIFIED_SIG)
            .unwrap()
            .connect(&slot);

        srv.slots().get::<()>(ServiceInstance::START_SLOT).unwrap().run(());
        assert!(srv.is_started());

        srv.notify(NotificationType::Failure, "disk full");
        assert_eq!(recorder.events(), vec!["disk full".to_string()]);

        srv.slots().get::<()>(ServiceInstance::STOP_SLOT).unwrap().run(());
        assert!(srv.is_stopped());
    }
}
