// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Declarative channel wiring between service signals and slots.

use serde::{Deserialize, Serialize};

/// Signals and slots (by owner uid and name) attached to one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConnections {
    pub channel: String,
    pub signals: Vec<(String, String)>,
    pub slots: Vec<(String, String)>,
}

impl ProxyConnections {
    /// Channel name replaced by a generated one when registered
    pub const UNDEFINED_CHANNEL: &'static str = "undefined";

    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            signals: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn add_signal_connection(&mut self, uid: impl Into<String>, key: impl Into<String>) {
        self.signals.push((uid.into(), key.into()));
    }

    pub fn add_slot_connection(&mut self, uid: impl Into<String>, key: impl Into<String>) {
        self.slots.push((uid.into(), key.into()));
    }

    pub fn with_signal(mut self, uid: impl Into<String>, key: impl Into<String>) -> Self {
        self.add_signal_connection(uid, key);
        self
    }

    pub fn with_slot(mut self, uid: impl Into<String>, key: impl Into<String>) -> Self {
        self.add_slot_connection(uid, key);
        self
    }

    pub fn has_undefined_channel(&self) -> bool {
        self.channel.is_empty() || self.channel == Self::UNDEFINED_CHANNEL
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.slots.is_empty()
    }
}

impl Default for ProxyConnections {
    fn default() -> Self {
        Self::new(Self::UNDEFINED_CHANNEL)
    }
}
