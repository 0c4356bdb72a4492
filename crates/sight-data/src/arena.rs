// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Object arena issuing generation-checked handles.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::object::{Data, Object};
use crate::{DataError, Result};

/// Stable identity of an object in an [`ObjectArena`]
///
/// The generation is bumped whenever a slot is freed, so a handle to a
/// removed object never resolves to the object that reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct ArenaSlot {
    generation: u32,
    object: Option<Arc<Object>>,
}

#[derive(Default)]
struct ArenaInner {
    slots: Vec<ArenaSlot>,
    free: Vec<u32>,
    by_uid: AHashMap<String, ObjectHandle>,
}

impl ArenaInner {
    fn resolve(&self, handle: ObjectHandle) -> Option<&Arc<Object>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.object.as_ref())
    }
}

/// Owner of every live data object, indexed by handle and by uid
#[derive(Default)]
pub struct ObjectArena {
    inner: RwLock<ArenaInner>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object; its uid must not already be in use
    pub fn insert(&self, object: Object) -> Result<ObjectHandle> {
        let mut inner = self.inner.write();

        if inner.by_uid.contains_key(object.uid()) {
            return Err(DataError::DuplicateUid(object.uid().to_string()));
        }

        let uid = object.uid().to_string();
        let object = Arc::new(object);

        let handle = match inner.free.pop() {
            Some(index) => {
                let slot = &mut inner.slots[index as usize];
                slot.object = Some(object);
                ObjectHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = inner.slots.len() as u32;
                inner.slots.push(ArenaSlot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectHandle { index, generation: 0 }
            }
        };

        debug!("Object '{}' stored as {}", uid, handle);
        inner.by_uid.insert(uid, handle);
        Ok(handle)
    }

    /// Convenience for `insert(Object::new(data))`
    pub fn create<D: Data>(&self, data: D) -> Result<ObjectHandle> {
        self.insert(Object::new(data))
    }

    /// Resolve a handle; `None` once the object was removed
    pub fn get(&self, handle: ObjectHandle) -> Option<Arc<Object>> {
        self.inner.read().resolve(handle).cloned()
    }

    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.inner.read().resolve(handle).is_some()
    }

    /// Remove an object and invalidate every handle to it
    pub fn remove(&self, handle: ObjectHandle) -> Result<Arc<Object>> {
        let mut inner = self.inner.write();

        let object = match inner.slots.get_mut(handle.index as usize) {
            Some(slot) if slot.generation == handle.generation && slot.object.is_some() => {
                slot.generation = slot.generation.wrapping_add(1);
                slot.object.take()
            }
            _ => None,
        }
        .ok_or(DataError::Expired(handle))?;

        inner.by_uid.remove(object.uid());
        inner.free.push(handle.index);
        debug!("Object '{}' removed ({})", object.uid(), handle);
        Ok(object)
    }

    /// Handle of the object with this uid
    pub fn find(&self, uid: &str) -> Option<ObjectHandle> {
        self.inner.read().by_uid.get(uid).copied()
    }

    pub fn uid_of(&self, handle: ObjectHandle) -> Option<String> {
        self.get(handle).map(|object| object.uid().to_string())
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live handles, in slot order
    pub fn handles(&self) -> Vec<ObjectHandle> {
        let inner = self.inner.read();
        inner
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.object.is_some())
            .map(|(index, slot)| ObjectHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Boolean, Integer};

    #[test]
    fn test_insert_get_remove() {
        let arena = ObjectArena::new();
        let h = arena.create(Integer(3)).unwrap();
        assert!(arena.is_live(h));
        assert_eq!(arena.get(h).unwrap().read::<Integer>().unwrap().0, 3);

        let removed = arena.remove(h).unwrap();
        assert_eq!(removed.classname(), Integer::CLASSNAME);
        assert!(!arena.is_live(h));
        assert!(arena.get(h).is_none());
        assert_eq!(arena.remove(h).unwrap_err(), DataError::Expired(h));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_stale_handle_does_not_resolve_to_reused_slot() {
        let arena = ObjectArena::new();
        let old = arena.create(Integer(1)).unwrap();
        arena.remove(old).unwrap();

        let new = arena.create(Boolean(true)).unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(arena.get(old).is_none());
        assert!(arena.get(new).unwrap().is::<Boolean>());
    }

    #[test]
    fn test_uid_index() {
        let arena = ObjectArena::new();
        let h = arena.insert(Object::new(Integer(0)).with_uid("counter")).unwrap();
        assert_eq!(arena.find("counter"), Some(h));
        assert_eq!(arena.uid_of(h).as_deref(), Some("counter"));

        let dup = arena.insert(Object::new(Integer(1)).with_uid("counter"));
        assert_eq!(dup.unwrap_err(), DataError::DuplicateUid("counter".into()));

        arena.remove(h).unwrap();
        assert_eq!(arena.find("counter"), None);
        assert!(arena.handles().is_empty());
    }
}
