// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # sight-observability
//!
//! Logging setup shared by Sight applications and tests, with per-crate
//! debug flags.
//!
//! ## Features
//! - `file-logging`: daily rolling log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known Sight crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "sight",
    "sight-com",
    "sight-data",
    "sight-services",
    "sight-config",
    "sight-observability",
];
