// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod service;

pub use service::{KeyConnections, Service};
