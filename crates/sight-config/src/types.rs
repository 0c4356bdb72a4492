// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `sight.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SightConfig {
    pub logging: LoggingSettings,
    pub app_manager: AppManagerSettings,
    pub app: AppConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when no per-crate flag applies (`trace` .. `error`)
    pub level: String,
    /// `full`, `compact` or `pretty`
    pub format: String,
    /// Crates logged at debug level, without the `sight-` prefix
    pub debug_crates: Vec<String>,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
            debug_crates: Vec::new(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 7,
        }
    }
}

/// Application manager settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppManagerSettings {
    /// Run the manager and its services on a dedicated worker thread
    pub use_worker: bool,
    pub worker_name: String,
}

impl Default for AppManagerSettings {
    fn default() -> Self {
        Self {
            use_worker: false,
            worker_name: "sight-app".to_string(),
        }
    }
}

/// Declarative application: inputs, services and their wiring
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub inputs: Vec<InputConfig>,
    pub services: Vec<ServiceConfig>,
    pub connections: Vec<ConnectionConfig>,
}

/// Named parameter of the application
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputConfig {
    pub key: String,
    /// `object`, `channel` or `other`
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    /// Data classname for objects, plain value otherwise
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

fn default_input_type() -> String {
    "object".to_string()
}

/// One service of the application
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub uid: String,
    /// Classname registered in the service factory
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
}

/// Object binding of a service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectConfig {
    /// Logical object id, or the key of an application input
    pub id: String,
    pub key: String,
    /// `in`/`input`, `inout` or `out`/`output`
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default)]
    pub optional: bool,
}

fn default_access() -> String {
    "inout".to_string()
}

/// Proxy channel joining signals and slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Channel name; generated when absent
    pub channel: Option<String>,
    pub signals: Vec<Endpoint>,
    pub slots: Vec<Endpoint>,
}

/// Signal or slot `key` of the service (or object) `uid`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub uid: String,
    pub key: String,
}

impl Endpoint {
    pub fn new(uid: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_section_parses() {
        let text = r#"
            [[app.inputs]]
            key = "image"

            [[app.services]]
            uid = "reader"
            type = "sight::module::Reader"
            auto_start = true
            objects = [{ id = "image", key = "target", access = "in" }]

            [[app.connections]]
            signals = [{ uid = "reader", key = "updated" }]
        "#;

        let config: SightConfig = toml::from_str(text).unwrap();
        assert_eq!(config.app.inputs[0].input_type, "object");
        assert_eq!(config.app.services[0].service_type, "sight::module::Reader");
        assert_eq!(config.app.services[0].objects[0].access, "in");
        assert!(!config.app.services[0].auto_update);
        assert_eq!(config.app.connections[0].channel, None);
        assert_eq!(config.logging.level, "info");
    }
}
