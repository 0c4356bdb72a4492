// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared service-layer types.

pub mod errors;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sight_data::ObjectHandle;

pub use errors::{RegistryError, ServiceError, ServiceResult};

static SERVICE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How a service accesses an object bound under one of its keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Read-only
    Input,
    /// Read-write, shared with other services
    InOut,
    /// Produced by the service
    Output,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Input => write!(f, "input"),
            Access::InOut => write!(f, "inout"),
            Access::Output => write!(f, "output"),
        }
    }
}

impl std::str::FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "input" => Ok(Access::Input),
            "inout" => Ok(Access::InOut),
            "out" | "output" => Ok(Access::Output),
            _ => Err(format!("Invalid access mode: {}", s)),
        }
    }
}

/// Lifecycle state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Stopped,
    Starting,
    Started,
    Stopping,
    Swapping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Stopped => write!(f, "STOPPED"),
            ServiceState::Starting => write!(f, "STARTING"),
            ServiceState::Started => write!(f, "STARTED"),
            ServiceState::Stopping => write!(f, "STOPPING"),
            ServiceState::Swapping => write!(f, "SWAPPING"),
        }
    }
}

/// Declared object dependency of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectServiceConfig {
    /// Logical object id the key is bound to, if declared
    pub id: Option<String>,
    pub key: String,
    pub access: Access,
    pub auto_connect: bool,
    pub optional: bool,
}

/// Kind of user notification a service may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    Info,
    Success,
    Failure,
}

/// Process-unique identity of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(u64);

impl ServiceId {
    pub(crate) fn next() -> Self {
        ServiceId(SERVICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "srv#{}", self.0)
    }
}

/// Payload of the registry's `registered`/`unregistered` signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEvent {
    pub object: ObjectHandle,
    pub key: String,
    /// Logical object id the producing service declared for `key`
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_parsing() {
        assert_eq!("in".parse::<Access>().unwrap(), Access::Input);
        assert_eq!("INOUT".parse::<Access>().unwrap(), Access::InOut);
        assert_eq!("output".parse::<Access>().unwrap(), Access::Output);
        assert!("readwrite".parse::<Access>().is_err());
        assert_eq!(Access::InOut.to_string(), "inout");
    }

    #[test]
    fn test_service_ids_are_unique() {
        assert_ne!(ServiceId::next(), ServiceId::next());
    }
}
