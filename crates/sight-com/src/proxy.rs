// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Channel-keyed many-to-many wiring between signals and slots.
//!
//! Every signal attached to a channel is connected to every slot attached to
//! the same channel, whichever is attached first.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::erased::{AnySignal, AnySlot};
use crate::signal::Connection;

#[derive(Default)]
pub struct Proxy {
    channels: Mutex<AHashMap<String, Channel>>,
}

#[derive(Default)]
struct Channel {
    signals: Vec<Arc<dyn AnySignal>>,
    slots: Vec<Arc<dyn AnySlot>>,
    links: Vec<Link>,
}

struct Link {
    signal: usize,
    slot: usize,
    connection: Connection,
}

impl Channel {
    fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.slots.is_empty()
    }

    fn link(&mut self, signal: &Arc<dyn AnySignal>, slot: &Arc<dyn AnySlot>, channel: &str) {
        match signal.connect_any(slot.as_ref()) {
            Ok(connection) => self.links.push(Link {
                signal: signal_id(signal),
                slot: slot_id(slot),
                connection,
            }),
            Err(e) => warn!("Proxy channel '{}': cannot connect: {}", channel, e),
        }
    }
}

fn signal_id(signal: &Arc<dyn AnySignal>) -> usize {
    Arc::as_ptr(signal) as *const () as usize
}

fn slot_id(slot: &Arc<dyn AnySlot>) -> usize {
    Arc::as_ptr(slot) as *const () as usize
}

impl Proxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a signal to a channel
    pub fn connect_signal(&self, channel: &str, signal: Arc<dyn AnySignal>) {
        let mut channels = self.channels.lock();
        let ch = channels.entry(channel.to_string()).or_default();

        if ch.signals.iter().any(|s| signal_id(s) == signal_id(&signal)) {
            warn!("Signal already attached to proxy channel '{}'", channel);
            return;
        }

        let slots = ch.slots.clone();
        for slot in &slots {
            ch.link(&signal, slot, channel);
        }
        ch.signals.push(signal);
        debug!("Signal attached to proxy channel '{}'", channel);
    }

    /// Attach a slot to a channel
    pub fn connect_slot(&self, channel: &str, slot: Arc<dyn AnySlot>) {
        let mut channels = self.channels.lock();
        let ch = channels.entry(channel.to_string()).or_default();

        if ch.slots.iter().any(|s| slot_id(s) == slot_id(&slot)) {
            warn!("Slot already attached to proxy channel '{}'", channel);
            return;
        }

        let signals = ch.signals.clone();
        for signal in &signals {
            ch.link(signal, &slot, channel);
        }
        ch.slots.push(slot);
        debug!("Slot attached to proxy channel '{}'", channel);
    }

    /// Detach a signal; returns false if it was not attached
    pub fn disconnect_signal(&self, channel: &str, signal: &Arc<dyn AnySignal>) -> bool {
        let id = signal_id(signal);
        self.detach(channel, |ch| {
            let before = ch.signals.len();
            ch.signals.retain(|s| signal_id(s) != id);
            ch.links.retain(|link| {
                if link.signal == id {
                    link.connection.disconnect();
                    false
                } else {
                    true
                }
            });
            before != ch.signals.len()
        })
    }

    /// Detach a slot; returns false if it was not attached
    pub fn disconnect_slot(&self, channel: &str, slot: &Arc<dyn AnySlot>) -> bool {
        let id = slot_id(slot);
        self.detach(channel, |ch| {
            let before = ch.slots.len();
            ch.slots.retain(|s| slot_id(s) != id);
            ch.links.retain(|link| {
                if link.slot == id {
                    link.connection.disconnect();
                    false
                } else {
                    true
                }
            });
            before != ch.slots.len()
        })
    }

    fn detach(&self, channel: &str, f: impl FnOnce(&mut Channel) -> bool) -> bool {
        let mut channels = self.channels.lock();
        let Some(ch) = channels.get_mut(channel) else {
            return false;
        };
        let removed = f(ch);
        if ch.is_empty() {
            channels.remove(channel);
        }
        removed
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.lock().contains_key(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Signals, Slot, Slots};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_channel_links_all_pairs() {
        let proxy = Proxy::new();
        let signals = Signals::new();
        let slots = Slots::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let s1 = signals.new_signal::<u8>("s1");
        let s2 = signals.new_signal::<u8>("s2");
        for key in ["a", "b"] {
            let hits = hits.clone();
            slots.insert(key, Slot::new(move |_: u8| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        proxy.connect_slot("ch", slots.get_any("a").unwrap());
        proxy.connect_signal("ch", signals.get_any("s1").unwrap());
        proxy.connect_signal("ch", signals.get_any("s2").unwrap());
        proxy.connect_slot("ch", slots.get_any("b").unwrap());

        s1.emit(0);
        s2.emit(0);
        assert_eq!(hits.load(Ordering::SeqCst), 4);

        assert!(proxy.disconnect_signal("ch", &signals.get_any("s1").unwrap()));
        s1.emit(0);
        assert_eq!(hits.load(Ordering::SeqCst), 4);

        assert!(proxy.disconnect_signal("ch", &signals.get_any("s2").unwrap()));
        assert!(proxy.disconnect_slot("ch", &slots.get_any("a").unwrap()));
        assert!(proxy.disconnect_slot("ch", &slots.get_any("b").unwrap()));
        assert_eq!(proxy.channel_count(), 0);
        assert!(!proxy.disconnect_slot("ch", &slots.get_any("b").unwrap()));
    }

    #[test]
    fn test_type_mismatch_is_skipped() {
        let proxy = Proxy::new();
        let signals = Signals::new();
        let slots = Slots::new();
        let sig = signals.new_signal::<u8>("s");
        slots.insert("wrong", Slot::new(|_: String| {}));

        proxy.connect_signal("ch", signals.get_any("s").unwrap());
        proxy.connect_slot("ch", slots.get_any("wrong").unwrap());
        assert_eq!(sig.num_connections(), 0);
        assert!(proxy.has_channel("ch"));
    }
}
