// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{ConfigError, ConfigResult, SightConfig};

const CONFIG_FILE_NAME: &str = "sight.toml";

/// Find the Sight configuration file
///
/// Search order:
/// 1. `SIGHT_CONFIG_PATH` environment variable
/// 2. Current working directory: `./sight.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SIGHT_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SIGHT_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Sight configuration file '{}' not found in any of these locations:\n{}\n\nSet SIGHT_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SightConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config = load_config_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Parse configuration text without applying overrides
pub fn load_config_str(content: &str) -> ConfigResult<SightConfig> {
    Ok(toml::from_str(content)?)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SIGHT_LOG_LEVEL` -> `logging.level`
/// - `SIGHT_LOG_FORMAT` -> `logging.format`
/// - `SIGHT_LOG_DIR` -> `logging.log_dir`
/// - `SIGHT_USE_WORKER` -> `app_manager.use_worker`
pub fn apply_environment_overrides(config: &mut SightConfig) {
    if let Ok(value) = env::var("SIGHT_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("SIGHT_LOG_FORMAT") {
        config.logging.format = value;
    }
    if let Ok(value) = env::var("SIGHT_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("SIGHT_USE_WORKER") {
        config.app_manager.use_worker = parse_flag(&value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - e.g. `{"log_level": "debug", "use_worker": "true"}`
pub fn apply_cli_overrides(config: &mut SightConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("file_logging") {
        config.logging.file_logging = parse_flag(value);
    }
    if let Some(value) = cli_args.get("use_worker") {
        config.app_manager.use_worker = parse_flag(value);
    }
    if let Some(value) = cli_args.get("worker_name") {
        config.app_manager.worker_name = value.clone();
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
