// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that an application description is consistent before a manager
//! tries to launch it.

use std::collections::HashSet;

use crate::{ConfigError, ConfigResult, SightConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 3] = ["full", "compact", "pretty"];
const ACCESS_MODES: [&str; 5] = ["in", "input", "inout", "out", "output"];
const INPUT_TYPES: [&str; 3] = ["object", "channel", "other"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    Duplicate { field: String, value: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    UnknownReference { field: String, uid: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate { field, value } => {
                write!(f, "Duplicate {}: '{}'", field, value)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::UnknownReference { field, uid } => {
                write!(f, "{} references unknown service or input '{}'", field, uid)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Logging level and format
/// - Duplicate service uids and input keys
/// - Empty or duplicate object keys, empty object ids, unknown access modes
/// - Connection endpoints naming unknown services (object ids are allowed)
/// - Empty connections
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &SightConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_logging(config, &mut errors);
    validate_inputs(config, &mut errors);
    validate_services(config, &mut errors);
    validate_connections(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_logging(config: &SightConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("must be one of {:?}", LOG_LEVELS),
        });
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("must be one of {:?}", LOG_FORMATS),
        });
    }
}

fn validate_inputs(config: &SightConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut keys = HashSet::new();

    for (i, input) in config.app.inputs.iter().enumerate() {
        if input.key.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("app.inputs[{}].key", i),
            });
        } else if !keys.insert(input.key.as_str()) {
            errors.push(ConfigValidationError::Duplicate {
                field: "app.inputs.key".to_string(),
                value: input.key.clone(),
            });
        }

        if !INPUT_TYPES.contains(&input.input_type.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("app.inputs[{}].type", i),
                reason: format!("must be one of {:?}", INPUT_TYPES),
            });
        }
    }
}

fn validate_services(config: &SightConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut uids = HashSet::new();

    for (i, service) in config.app.services.iter().enumerate() {
        if service.service_type.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("app.services[{}].type", i),
            });
        }

        if !service.uid.is_empty() && !uids.insert(service.uid.as_str()) {
            errors.push(ConfigValidationError::Duplicate {
                field: "app.services.uid".to_string(),
                value: service.uid.clone(),
            });
        }

        let mut keys = HashSet::new();
        for (j, object) in service.objects.iter().enumerate() {
            let field = format!("app.services[{}].objects[{}]", i, j);

            if object.id.is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: format!("{}.id", field),
                });
            }

            if object.key.is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: format!("{}.key", field),
                });
            } else if !keys.insert(object.key.as_str()) {
                errors.push(ConfigValidationError::Duplicate {
                    field: format!("app.services[{}].objects.key", i),
                    value: object.key.clone(),
                });
            }

            if !ACCESS_MODES.contains(&object.access.to_lowercase().as_str()) {
                errors.push(ConfigValidationError::InvalidValue {
                    field: format!("{}.access", field),
                    reason: format!("must be one of {:?}", ACCESS_MODES),
                });
            }
        }
    }
}

fn validate_connections(config: &SightConfig, errors: &mut Vec<ConfigValidationError>) {
    let services: HashSet<&str> = config.app.services.iter().map(|s| s.uid.as_str()).collect();
    let inputs: HashSet<&str> = config.app.inputs.iter().map(|i| i.key.as_str()).collect();
    let objects: HashSet<&str> = config
        .app
        .services
        .iter()
        .flat_map(|s| s.objects.iter().map(|o| o.id.as_str()))
        .collect();

    for (i, cnx) in config.app.connections.iter().enumerate() {
        if cnx.signals.is_empty() && cnx.slots.is_empty() {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("app.connections[{}]", i),
                reason: "has neither signals nor slots".to_string(),
            });
        }

        // Slots belong to services; signals may also come from objects
        for endpoint in &cnx.slots {
            if !services.contains(endpoint.uid.as_str()) {
                errors.push(ConfigValidationError::UnknownReference {
                    field: format!("app.connections[{}].slots", i),
                    uid: endpoint.uid.clone(),
                });
            }
        }
        for endpoint in &cnx.signals {
            let uid = endpoint.uid.as_str();
            if !services.contains(uid) && !inputs.contains(uid) && !objects.contains(uid) {
                errors.push(ConfigValidationError::UnknownReference {
                    field: format!("app.connections[{}].signals", i),
                    uid: endpoint.uid.clone(),
                });
            }
        }
    }
}
