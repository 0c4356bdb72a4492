// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Data payloads and the object wrapper carrying uid and signals.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use sight_com::{Signal, Signals};

static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Payload of a data object
pub trait Data: AsAny + Send + Sync + fmt::Debug + 'static {
    /// Fully qualified class name, also the key used by `DataFactory`
    fn classname(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integer(pub i64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Float(pub f64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boolean(pub bool);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text(pub String);

/// Named references to other objects (by uid)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composite {
    pub children: BTreeMap<String, String>,
}

impl Integer {
    pub const CLASSNAME: &'static str = "sight::data::Integer";
}

impl Float {
    pub const CLASSNAME: &'static str = "sight::data::Float";
}

impl Boolean {
    pub const CLASSNAME: &'static str = "sight::data::Boolean";
}

impl Text {
    pub const CLASSNAME: &'static str = "sight::data::String";
}

impl Composite {
    pub const CLASSNAME: &'static str = "sight::data::Composite";
}

impl Data for Integer {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }
}

impl Data for Float {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }
}

impl Data for Boolean {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }
}

impl Data for Text {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }
}

impl Data for Composite {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }
}

/// A data payload with identity and a `modified` signal
pub struct Object {
    uid: String,
    classname: &'static str,
    data: RwLock<Box<dyn Data>>,
    signals: Signals,
}

impl Object {
    pub const MODIFIED_SIG: &'static str = "modified";

    pub fn new<D: Data>(data: D) -> Self {
        Self::from_boxed(Box::new(data))
    }

    pub fn from_boxed(data: Box<dyn Data>) -> Self {
        let classname = data.classname();
        let uid = generate_uid(classname);
        let signals = Signals::new();
        signals.new_signal::<()>(Self::MODIFIED_SIG);

        Self {
            uid,
            classname,
            data: RwLock::new(data),
            signals,
        }
    }

    /// Override the generated uid
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn classname(&self) -> &'static str {
        self.classname
    }

    pub fn is<T: Data>(&self) -> bool {
        (**self.data.read()).as_any().is::<T>()
    }

    /// Typed read access; `None` if the payload is another type
    pub fn read<T: Data>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.data.read(), |data| (**data).as_any().downcast_ref::<T>()).ok()
    }

    /// Typed write access; `None` if the payload is another type
    ///
    /// Writing does not emit `modified`; call `notify_modified()` once done.
    pub fn write<T: Data>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.data.write(), |data| {
            (**data).as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn modified_signal(&self) -> Option<Signal<()>> {
        self.signals.get::<()>(Self::MODIFIED_SIG)
    }

    /// Emit `modified`; returns the number of receivers
    pub fn notify_modified(&self) -> usize {
        self.modified_signal().map(|sig| sig.emit(())).unwrap_or(0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("uid", &self.uid)
            .field("classname", &self.classname)
            .finish()
    }
}

fn generate_uid(classname: &str) -> String {
    let n = UID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let leaf = classname.rsplit("::").next().unwrap_or(classname);
    format!("{}-{}", leaf, n)
}
