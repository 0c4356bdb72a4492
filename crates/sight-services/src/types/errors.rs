// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service layer error types.

Expected absence (an unregistered key, an unknown object id) is not an error:
lookups return `Option` or empty collections. These types cover contract
violations and failed lifecycle hooks.
*/

use sight_com::ComError;
use sight_data::{DataError, ObjectHandle};
use thiserror::Error;

use super::Access;

/// Object-service registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The handle refers to an object that was removed from the arena
    #[error("Object handle expired: {0}")]
    ObjectExpired(ObjectHandle),

    #[error("No object registered for service '{service}' under key '{key}' ({access})")]
    NotRegistered {
        service: String,
        key: String,
        access: Access,
    },

    /// Legacy default-key and keyed registrations on the same service
    #[error("Service '{0}' mixes default-key and keyed registrations")]
    MixedRegistration(String),

    #[error("Service '{0}' is not registered")]
    ServiceNotRegistered(String),
}

/// Service layer errors
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Not found: {resource} with id '{id}'")]
    NotFound { resource: String, id: String },

    /// Required objects are not bound (start refused)
    #[error("Service '{uid}' is missing required objects: {keys:?}")]
    MissingObjects { uid: String, keys: Vec<String> },

    /// Invalid state for operation (e.g. stopping a stopped service)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown service type: {0}")]
    UnknownType(String),

    /// A lifecycle hook returned an error
    #[error("Service '{uid}' failed while {hook}: {reason}")]
    HookFailed {
        uid: String,
        hook: &'static str,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Communication error: {0}")]
    Com(#[from] ComError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<sight_config::ConfigError> for ServiceError {
    fn from(err: sight_config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}
