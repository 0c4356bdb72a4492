// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Test doubles shared by the unit tests of this crate.

use std::any::Any;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sight_com::Slot;

use crate::instance::ServiceInstance;
use crate::traits::Service;
use crate::types::{RegistrationEvent, ServiceError, ServiceResult};

/// Records every hook call and the thread it ran on
#[derive(Default)]
pub(crate) struct RecorderService {
    fail_start: bool,
    fail_stop: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
    threads: Mutex<Vec<Option<String>>>,
}

impl RecorderService {
    pub const CLASSNAME: &'static str = "sight::test::Recorder";

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Let the next `stopping` succeed
    pub fn allow_stop(&self) {
        self.fail_stop.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == name).count()
    }

    pub fn threads(&self) -> Vec<Option<String>> {
        self.threads.lock().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().push(name);
        self.threads
            .lock()
            .push(std::thread::current().name().map(str::to_string));
    }
}

impl Service for RecorderService {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn starting(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.record("starting");
        if self.fail_start {
            return Err(ServiceError::Internal("start refused".into()));
        }
        Ok(())
    }

    fn stopping(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.record("stopping");
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ServiceError::Internal("stop refused".into()));
        }
        Ok(())
    }

    fn updating(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        self.record("updating");
        Ok(())
    }

    fn swapping(&self, _srv: &ServiceInstance, _key: &str) -> ServiceResult<()> {
        self.record("swapping");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Service with empty hooks
pub(crate) struct IdleService;

impl IdleService {
    pub const CLASSNAME: &'static str = "sight::test::Idle";
}

impl Service for IdleService {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn starting(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        Ok(())
    }

    fn stopping(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        Ok(())
    }

    fn updating(&self, _srv: &ServiceInstance) -> ServiceResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Collects signal payloads as strings
#[derive(Default, Clone)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn string_slot(&self) -> Slot<String> {
        let events = self.events.clone();
        Slot::new(move |msg: String| events.lock().push(msg))
    }

    /// Records `"<label> <object> <key> <id or ->"`
    pub fn event_slot(&self, label: &'static str) -> Slot<RegistrationEvent> {
        let events = self.events.clone();
        Slot::new(move |event: RegistrationEvent| {
            events.lock().push(format!(
                "{} {} {} {}",
                label,
                event.object,
                event.key,
                event.id.as_deref().unwrap_or("-")
            ))
        })
    }
}

/// In-memory log sink for `tracing_subscriber::fmt`
#[derive(Default, Clone)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Run `f` with every event on this thread written here
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
