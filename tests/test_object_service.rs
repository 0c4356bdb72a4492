// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Object-service registry behaviour seen from outside the crate

mod common;

use common::{context, CountingService, EventLog};
use sight::data::Integer;
use sight::services::{Access, RegistryError};

#[test]
fn test_register_then_unregister_service() {
    let ctx = context();
    let s1 = ctx.wrap_service(CountingService::default(), "s1");
    let o1 = ctx.arena.create(Integer(1)).unwrap();

    ctx.osr
        .register_service_keyed(o1, "image", Access::InOut, &s1)
        .unwrap();
    assert!(ctx.osr.is_registered("image", Access::InOut, &s1));
    assert_eq!(ctx.osr.get_registered("image", Access::InOut, &s1), Some(o1));
    assert_eq!(s1.object_handle("image", Access::InOut), Some(o1));

    assert_eq!(ctx.osr.unregister_service(&s1), 1);
    assert!(!ctx.osr.is_registered("image", Access::InOut, &s1));
    assert!(!ctx.osr.is_service_registered(&s1));
    assert_eq!(s1.object_handle("image", Access::InOut), None);
}

#[test]
fn test_two_services_sharing_an_object() {
    let ctx = context();
    let s1 = ctx.wrap_service(CountingService::default(), "s1");
    let s2 = ctx.wrap_service(CountingService::default(), "s2");
    let o1 = ctx.arena.create(Integer(1)).unwrap();
    let o2 = ctx.arena.create(Integer(2)).unwrap();

    ctx.osr.register_service_keyed(o1, "key1", Access::InOut, &s1).unwrap();
    ctx.osr.register_service_keyed(o2, "key2", Access::InOut, &s1).unwrap();
    ctx.osr.register_service_keyed(o1, "key1", Access::InOut, &s2).unwrap();

    assert_eq!(ctx.osr.get_services_of_type(CountingService::CLASSNAME).len(), 2);
    assert_eq!(ctx.osr.get_services_for_object(o1, None).len(), 2);

    ctx.osr
        .unregister_service_keyed("key1", Access::InOut, &s1)
        .unwrap();

    assert!(ctx.osr.is_service_registered(&s1));
    assert!(ctx.osr.is_registered("key2", Access::InOut, &s1));
    assert!(!ctx.osr.is_registered("key1", Access::InOut, &s1));
    assert_eq!(ctx.osr.get_registered("key1", Access::InOut, &s2), Some(o1));
    assert_eq!(ctx.osr.get_services_for_object(o1, None).len(), 1);
}

#[test]
fn test_one_object_per_key_and_access() {
    let ctx = context();
    let srv = ctx.wrap_service(CountingService::default(), "srv");
    let a = ctx.arena.create(Integer(1)).unwrap();
    let b = ctx.arena.create(Integer(2)).unwrap();

    ctx.osr.register_service_keyed(a, "image", Access::Input, &srv).unwrap();
    ctx.osr.register_service_keyed(b, "image", Access::Input, &srv).unwrap();

    assert_eq!(ctx.osr.get_registered("image", Access::Input, &srv), Some(b));
    assert_eq!(ctx.osr.association_count(), 1);
    assert!(ctx.osr.get_services_for_object(a, None).is_empty());

    // Same key under another access is a different association
    ctx.osr.register_service_keyed(a, "image", Access::InOut, &srv).unwrap();
    assert_eq!(ctx.osr.association_count(), 2);
}

#[test]
fn test_service_enumerated_once_across_keys() {
    let ctx = context();
    let srv = ctx.wrap_service(CountingService::default(), "srv");

    let handles: Vec<_> = (0..4)
        .map(|i| ctx.arena.create(Integer(i)).unwrap())
        .collect();
    for (i, handle) in handles.iter().enumerate() {
        ctx.osr
            .register_service_keyed(*handle, &format!("key{}", i), Access::InOut, &srv)
            .unwrap();
    }

    assert_eq!(ctx.osr.get_services::<CountingService>().len(), 1);
    for (i, handle) in handles.iter().enumerate() {
        assert_eq!(
            ctx.osr.get_registered(&format!("key{}", i), Access::InOut, &srv),
            Some(*handle)
        );
    }
    assert_eq!(ctx.osr.get_objects_of_type::<Integer>().len(), 4);
}

#[test]
fn test_unregister_missing_association() {
    let ctx = context();
    let srv = ctx.wrap_service(CountingService::default(), "srv");

    let result = ctx.osr.unregister_service_keyed("nothing", Access::Input, &srv);
    assert!(matches!(result, Err(RegistryError::NotRegistered { .. })));
}

#[test]
fn test_only_output_registration_is_signalled() {
    let ctx = context();
    let log = EventLog::default();
    let on_registered = log.slot("registered");
    let on_unregistered = log.slot("unregistered");
    let _c1 = ctx.osr.registered_signal().connect(&on_registered);
    let _c2 = ctx.osr.unregistered_signal().connect(&on_unregistered);

    let srv = ctx.wrap_service(CountingService::default(), "srv");
    srv.register_object("result", "out", Access::Output, false, false);
    let input = ctx.arena.create(Integer(1)).unwrap();
    let output = ctx.arena.create(Integer(2)).unwrap();

    ctx.osr.register_service_keyed(input, "in", Access::Input, &srv).unwrap();
    ctx.osr.unregister_service_keyed("in", Access::Input, &srv).unwrap();
    assert!(log.events().is_empty());

    ctx.osr.register_service_output(output, "out", &srv).unwrap();
    ctx.osr.unregister_service_output("out", &srv).unwrap();
    assert_eq!(
        log.events(),
        vec!["registered out result", "unregistered out result"]
    );

    ctx.osr.unregister_service(&srv);
    assert_eq!(log.events().len(), 2);
}

#[test]
fn test_set_output_replaces_previous_object() {
    let ctx = context();
    let log = EventLog::default();
    let on_registered = log.slot("registered");
    let on_unregistered = log.slot("unregistered");
    let _c1 = ctx.osr.registered_signal().connect(&on_registered);
    let _c2 = ctx.osr.unregistered_signal().connect(&on_unregistered);

    let srv = ctx.wrap_service(CountingService::default(), "srv");
    let first = ctx.arena.create(Integer(1)).unwrap();
    let second = ctx.arena.create(Integer(2)).unwrap();

    srv.set_output("out", Some(first)).unwrap();
    srv.set_output("out", Some(second)).unwrap();
    srv.set_output("out", None).unwrap();

    assert_eq!(
        log.events(),
        vec![
            "registered out -",
            "unregistered out -",
            "registered out -",
            "unregistered out -",
        ]
    );
    assert!(!ctx.osr.is_registered("out", Access::Output, &srv));
}

#[test]
fn test_removed_object_cannot_be_registered() {
    let ctx = context();
    let srv = ctx.wrap_service(CountingService::default(), "srv");
    let handle = ctx.arena.create(Integer(1)).unwrap();
    ctx.arena.remove(handle).unwrap();

    let result = ctx.osr.register_service_keyed(handle, "image", Access::Input, &srv);
    assert!(matches!(result, Err(RegistryError::ObjectExpired(h)) if h == handle));
}
