//! Log/event channel between the core components and the host shell.
//!
//! Every core component reports leveled events upward instead of printing.
//! The host shell decides what to do with them; the default sink forwards
//! to `tracing` so a plain binary still gets structured logs.

use std::sync::{Arc, Mutex};

/// Severity of a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Per-operation detail (every cell write, every frame).
    Trace,
    /// Lifecycle milestones (stream created, stream closed).
    Status,
    /// Recovered or terminal failures.
    Error,
}

/// One reported event.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub kind: LogKind,
    pub message: String,
}

/// Receiver for core events.
///
/// One sink is shared by the decoder/dispatcher/FrameStack of a single
/// connection or import; sinks must be cheap to call and must not fail.
pub trait EventSink: Send + Sync {
    fn log(&self, kind: LogKind, message: String);
}

/// Default sink: forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, kind: LogKind, message: String) {
        match kind {
            LogKind::Trace => tracing::trace!("{message}"),
            LogKind::Status => tracing::info!("{message}"),
            LogKind::Error => tracing::error!("{message}"),
        }
    }
}

/// Sink that records events in memory; used by tests and the import API
/// to surface what went wrong.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("event sink poisoned").clone()
    }

    /// Messages of all events with the given kind.
    pub fn messages(&self, kind: LogKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.message)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn log(&self, kind: LogKind, message: String) {
        self.events
            .lock()
            .expect("event sink poisoned")
            .push(LogEvent { kind, message });
    }
}

/// Shared handle to an event sink.
pub type Events = Arc<dyn EventSink>;
