// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # sight-data
//!
//! Data objects shared between services.
//!
//! Objects live in an [`ObjectArena`] and are referred to by
//! [`ObjectHandle`]s (slot index + generation). A handle whose object was
//! removed stops resolving, so registries holding handles never observe a
//! recycled slot as the old object.

pub mod arena;
pub mod factory;
pub mod object;

pub use arena::{ObjectArena, ObjectHandle};
pub use factory::DataFactory;
pub use object::{AsAny, Boolean, Composite, Data, Float, Integer, Object, Text};

/// Data layer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("Object uid already in use: {0}")]
    DuplicateUid(String),

    #[error("Unknown data classname: {0}")]
    UnknownClassname(String),

    #[error("Type mismatch: object '{uid}' is a {actual}")]
    TypeMismatch { uid: String, actual: &'static str },

    #[error("Object handle expired: {0}")]
    Expired(ObjectHandle),
}

pub type Result<T> = std::result::Result<T, DataError>;
