// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Classname-keyed service constructors.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::traits::Service;
use crate::types::{ServiceError, ServiceResult};

type Constructor = Arc<dyn Fn() -> Box<dyn Service> + Send + Sync>;

#[derive(Default)]
pub struct ServiceFactory {
    constructors: RwLock<AHashMap<String, Constructor>>,
}

impl ServiceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor of `classname`
    pub fn register<S, F>(&self, classname: &str, ctor: F)
    where
        S: Service,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let ctor: Constructor = Arc::new(move || Box::new(ctor()) as Box<dyn Service>);
        if self
            .constructors
            .write()
            .insert(classname.to_string(), ctor)
            .is_some()
        {
            debug!("Service type '{}' re-registered", classname);
        }
    }

    pub fn is_registered(&self, classname: &str) -> bool {
        self.constructors.read().contains_key(classname)
    }

    pub fn create(&self, classname: &str) -> ServiceResult<Box<dyn Service>> {
        let ctor = self
            .constructors
            .read()
            .get(classname)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownType(classname.to_string()))?;
        Ok(ctor())
    }

    pub fn classnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }
}
