// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sight_config::LoggingSettings;

use crate::CrateDebugFlags;

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub logging: LoggingConfig,
}

impl ObservabilityConfig {
    /// Per-crate flags named in the settings, merged into `flags`
    pub fn merge_debug_crates(settings: &LoggingSettings, flags: &mut CrateDebugFlags) {
        for name in &settings.debug_crates {
            if name.starts_with("sight") {
                flags.enable(name);
            } else {
                flags.enable(&format!("sight-{}", name));
            }
        }
    }
}

impl From<&LoggingSettings> for ObservabilityConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            logging: LoggingConfig {
                level: settings.level.to_lowercase(),
                format: LogFormat::parse(&settings.format),
                output: LogOutput::Stdout,
                file: settings.file_logging.then(|| FileLogging {
                    log_dir: settings.log_dir.clone(),
                    retention_days: settings.retention_days,
                }),
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Daily rolling files; honored with the `file-logging` feature only
    pub file: Option<FileLogging>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            output: LogOutput::Stdout,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
    Pretty,
}

impl LogFormat {
    /// Unknown names fall back to `Full`
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLogging {
    pub log_dir: PathBuf,
    pub retention_days: u32,
}
