// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod object_service;
pub mod proxy_connections;

pub use object_service::{Association, ObjectService, DEFAULT_KEY};
pub use proxy_connections::ProxyConnections;
