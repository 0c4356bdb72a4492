// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Classname-keyed constructors for data objects.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::object::{Boolean, Composite, Data, Float, Integer, Object, Text};
use crate::{DataError, Result};

type Constructor = Arc<dyn Fn() -> Box<dyn Data> + Send + Sync>;

#[derive(Default)]
pub struct DataFactory {
    constructors: RwLock<AHashMap<String, Constructor>>,
}

impl DataFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory knowing the built-in data types
    pub fn with_builtins() -> Self {
        let factory = Self::new();
        factory.register(Integer::CLASSNAME, || Integer::default());
        factory.register(Float::CLASSNAME, || Float::default());
        factory.register(Boolean::CLASSNAME, || Boolean::default());
        factory.register(Text::CLASSNAME, || Text::default());
        factory.register(Composite::CLASSNAME, || Composite::default());
        factory
    }

    pub fn register<D, F>(&self, classname: &str, ctor: F)
    where
        D: Data,
        F: Fn() -> D + Send + Sync + 'static,
    {
        let ctor: Constructor = Arc::new(move || Box::new(ctor()) as Box<dyn Data>);
        self.constructors.write().insert(classname.to_string(), ctor);
    }

    pub fn is_registered(&self, classname: &str) -> bool {
        self.constructors.read().contains_key(classname)
    }

    /// Build a new object of the given class with a generated uid
    pub fn create(&self, classname: &str) -> Result<Object> {
        let ctor = self
            .constructors
            .read()
            .get(classname)
            .cloned()
            .ok_or_else(|| DataError::UnknownClassname(classname.to_string()))?;
        Ok(Object::from_boxed(ctor()))
    }

    pub fn classnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }
}
