// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Application manager: dependency-gated start, teardown, inputs, chaining

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{context, counting, CountingService, ProducerService};
use sight::com::Worker;
use sight::config::AppManagerSettings;
use sight::data::Integer;
use sight::services::{
    Access, AppManager, InputType, ProxyConnections, ServiceContext, ServiceInstance,
    ServiceState,
};

fn reader(ctx: &ServiceContext, uid: &str, ids: &[(&str, &str)]) -> Arc<ServiceInstance> {
    let srv = ctx
        .create_service(CountingService::CLASSNAME, uid)
        .unwrap();
    for (id, key) in ids {
        srv.register_object(id, key, Access::Input, false, false);
    }
    srv
}

fn producer(ctx: &ServiceContext, uid: &str, id: &str) -> Arc<ServiceInstance> {
    let srv = ctx.create_service(ProducerService::CLASSNAME, uid).unwrap();
    srv.register_object(id, ProducerService::OUTPUT, Access::Output, false, false);
    srv
}

#[test]
fn test_service_starts_when_last_object_arrives() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "gate");
    let srv = reader(&ctx, "reader", &[("image", "image"), ("mask", "mask")]);
    mgr.add_service_instance(srv.clone(), true, false).unwrap();
    mgr.start_services().unwrap();
    assert_eq!(srv.state(), ServiceState::Stopped);

    let image = ctx.arena.create(Integer(1)).unwrap();
    mgr.add_object(image, "image").unwrap();
    assert_eq!(srv.state(), ServiceState::Stopped);

    let mask = ctx.arena.create(Integer(2)).unwrap();
    mgr.add_object(mask, "mask").unwrap();
    assert_eq!(srv.state(), ServiceState::Started);
    assert_eq!(counting(&srv).count("starting"), 1);

    mgr.remove_object(mask, "mask").unwrap();
    assert_eq!(srv.state(), ServiceState::Stopped);
    assert_eq!(srv.object_handle("mask", Access::Input), None);
    assert_eq!(srv.object_handle("image", Access::Input), Some(image));
}

#[test]
fn test_auto_update_runs_after_start() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "update");
    let srv = reader(&ctx, "reader", &[("value", "v")]);
    mgr.add_service_instance(srv.clone(), true, true).unwrap();
    mgr.start_services().unwrap();

    let h = ctx.arena.create(Integer(1)).unwrap();
    mgr.add_object(h, "value").unwrap();
    assert_eq!(counting(&srv).calls(), vec!["starting", "updating"]);
}

#[test]
fn test_teardown_twice_is_a_no_op() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "teardown");
    mgr.create().unwrap();

    let srv = reader(&ctx, "reader", &[("value", "v")]);
    mgr.add_service_instance(srv.clone(), true, false).unwrap();
    let h = ctx.arena.create(Integer(1)).unwrap();
    mgr.add_object(h, "value").unwrap();
    mgr.start_services().unwrap();
    assert!(srv.is_started());

    mgr.destroy().unwrap();
    mgr.destroy().unwrap();
    mgr.stop_and_unregister_services().unwrap();

    assert_eq!(counting(&srv).count("stopping"), 1);
    assert!(!ctx.osr.is_service_registered(&srv));
    assert_eq!(ctx.osr.association_count(), 0);
    assert_eq!(mgr.service_count(), 0);
    assert_eq!(mgr.get_object("value"), None);
    assert!(!mgr.is_started());
}

#[test]
fn test_check_inputs_waits_for_value() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "inputs");
    mgr.require_input("image", InputType::Object, "");
    mgr.require_optional_input("channel", InputType::Channel);

    assert!(!mgr.check_inputs());

    let h = ctx.arena.create(Integer(1)).unwrap();
    let uid = ctx.arena.uid_of(h).unwrap();
    mgr.replace_input("image", &uid);

    assert!(mgr.check_inputs());
    assert_eq!(mgr.get_input_id("image"), uid);
    assert_eq!(mgr.get_object(&uid), Some(h));
}

#[test]
fn test_check_inputs_accepts_object_under_generated_id() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "inputs");
    mgr.require_input("image", InputType::Object, "");
    assert!(!mgr.check_inputs());

    let h = ctx.arena.create(Integer(1)).unwrap();
    let id = mgr.get_input_id("image");
    assert_eq!(id, format!("{}-image", mgr.id()));
    mgr.add_object(h, &id).unwrap();

    assert!(mgr.check_inputs());
}

#[test]
fn test_default_input_creates_object() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "defaults");
    mgr.require_input("threshold", InputType::Object, Integer::CLASSNAME);

    assert!(mgr.check_inputs());
    let id = mgr.get_input_id("threshold");
    let handle = mgr.get_object(&id).unwrap();
    assert!(ctx.arena.get(handle).unwrap().is::<Integer>());
}

#[test]
fn test_output_feeds_consumer() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "chain");
    mgr.create().unwrap();

    let source = producer(&ctx, "source", "frame");
    let sink = reader(&ctx, "sink", &[("frame", "input")]);
    mgr.add_service_instance(sink.clone(), true, false).unwrap();
    mgr.add_service_instance(source.clone(), true, false).unwrap();

    mgr.start_services().unwrap();

    assert!(source.is_started());
    assert!(sink.is_started());
    let published = ctx
        .osr
        .get_registered(ProducerService::OUTPUT, Access::Output, &source)
        .unwrap();
    assert_eq!(sink.object_handle("input", Access::Input), Some(published));
    assert_eq!(mgr.get_object("frame"), Some(published));

    // Withdrawing the output stops the consumer
    mgr.stop_service(&source).unwrap();
    assert!(!sink.is_started());
    assert_eq!(mgr.get_object("frame"), None);
    assert_eq!(counting(&sink).calls(), vec!["starting", "stopping"]);

    mgr.destroy().unwrap();
}

#[test]
fn test_producer_on_own_worker_feeds_consumer() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "threaded-source");
    mgr.create().unwrap();

    let source_worker = Worker::new("source-worker").unwrap();
    let source = producer(&ctx, "source", "frame");
    source.set_worker(Some(source_worker.clone()));
    let sink = reader(&ctx, "sink", &[("frame", "input")]);
    mgr.add_service_instance(source.clone(), true, false).unwrap();
    mgr.add_service_instance(sink.clone(), true, false).unwrap();

    // The output is published from the source worker while the manager is
    // still busy starting services on this helper thread
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let starter = {
        let mgr = mgr.clone();
        thread::spawn(move || {
            let _ = done_tx.send(mgr.start_services());
        })
    };
    let started = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("start_services returned");
    started.unwrap();
    starter.join().unwrap();

    assert!(source.is_started());
    assert!(sink.is_started());
    let published = ctx
        .osr
        .get_registered(ProducerService::OUTPUT, Access::Output, &source)
        .unwrap();
    assert_eq!(sink.object_handle("input", Access::Input), Some(published));
    assert_eq!(mgr.get_object("frame"), Some(published));

    mgr.destroy().unwrap();
    assert!(!source.is_started());
    assert!(!sink.is_started());
    assert_eq!(mgr.get_object("frame"), None);
    assert_eq!(counting(&sink).calls(), vec!["starting", "stopping"]);
    source_worker.stop();
}

#[test]
fn test_proxy_channel_joins_services() {
    let ctx = context();
    let mgr = AppManager::new(&ctx, "proxy");
    let emitter = reader(&ctx, "emitter", &[]);
    let receiver = reader(&ctx, "receiver", &[]);

    let channel = mgr.add_proxy_connection(
        ProxyConnections::new(ProxyConnections::UNDEFINED_CHANNEL)
            .with_signal("emitter", ServiceInstance::UPDATED_SIG)
            .with_slot("receiver", ServiceInstance::UPDATE_SLOT),
    );
    assert!(channel.starts_with("AppManager_channel_"));

    mgr.add_service_instance(emitter.clone(), true, false).unwrap();
    mgr.add_service_instance(receiver.clone(), true, false).unwrap();
    mgr.start_services().unwrap();
    assert_eq!(emitter.proxy_channels(), vec![channel.clone()]);

    emitter.update().wait().unwrap().unwrap();
    assert_eq!(counting(&receiver).count("updating"), 1);

    mgr.stop_and_unregister_services().unwrap();
    assert_eq!(ctx.proxy.channel_count(), 0);
}

#[test]
fn test_manager_worker_runs_services() {
    let ctx = context();
    let worker = Worker::new("app-worker").unwrap();
    let mgr = AppManager::new(&ctx, "worker").with_worker(worker.clone());
    mgr.create().unwrap();

    let source = producer(&ctx, "source", "frame");
    let sink = reader(&ctx, "sink", &[("frame", "input")]);
    mgr.add_service_instance(source.clone(), true, false).unwrap();
    mgr.add_service_instance(sink.clone(), true, false).unwrap();
    assert!(source.worker().unwrap().same_as(&worker));

    mgr.start_services().unwrap();
    // The registry slot runs after the start task on the same worker
    worker.post_task(|| ()).wait().unwrap();

    assert!(source.is_started());
    assert!(sink.is_started());
    assert_eq!(mgr.started_service_count(), 2);

    mgr.destroy().unwrap();
    worker.post_task(|| ()).wait().unwrap();
    assert!(!sink.is_started());
    assert_eq!(mgr.started_service_count(), 0);
    worker.stop();
}

#[test]
fn test_settings_select_worker() {
    let ctx = context();
    let plain = AppManager::with_settings(&ctx, "plain", &AppManagerSettings::default()).unwrap();
    assert!(plain.worker().is_none());

    let settings = AppManagerSettings {
        use_worker: true,
        worker_name: "sight-test".to_string(),
    };
    let threaded = AppManager::with_settings(&ctx, "threaded", &settings).unwrap();
    let worker = threaded.worker().unwrap();
    let name = worker
        .post_task(|| std::thread::current().name().map(str::to_string))
        .wait()
        .unwrap();
    assert_eq!(name.as_deref(), Some("sight-test"));
    worker.stop();
}
