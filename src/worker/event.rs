use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::BusError;
use crate::message::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerEventKind {
    Start,
    Idle,
    Next,
    Done,
    Error,
    Stop,
}

impl fmt::Display for WorkerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerEventKind::Start => "start",
            WorkerEventKind::Idle => "idle",
            WorkerEventKind::Next => "next",
            WorkerEventKind::Done => "done",
            WorkerEventKind::Error => "error",
            WorkerEventKind::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Lifecycle signal emitted by the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct WorkerEvent<'a> {
    kind: WorkerEventKind,
    envelope: Option<&'a Envelope>,
    error: Option<&'a BusError>,
}

impl<'a> WorkerEvent<'a> {
    pub(crate) fn start() -> Self {
        Self::bare(WorkerEventKind::Start)
    }

    pub(crate) fn idle() -> Self {
        Self::bare(WorkerEventKind::Idle)
    }

    pub(crate) fn stop() -> Self {
        Self::bare(WorkerEventKind::Stop)
    }

    pub(crate) fn next(envelope: &'a Envelope) -> Self {
        Self {
            kind: WorkerEventKind::Next,
            envelope: Some(envelope),
            error: None,
        }
    }

    pub(crate) fn done(envelope: &'a Envelope) -> Self {
        Self {
            kind: WorkerEventKind::Done,
            envelope: Some(envelope),
            error: None,
        }
    }

    pub(crate) fn failure(envelope: &'a Envelope, error: &'a BusError) -> Self {
        Self {
            kind: WorkerEventKind::Error,
            envelope: Some(envelope),
            error: Some(error),
        }
    }

    fn bare(kind: WorkerEventKind) -> Self {
        Self {
            kind,
            envelope: None,
            error: None,
        }
    }

    pub fn kind(&self) -> WorkerEventKind {
        self.kind
    }

    /// The message being processed, for `next`, `done` and `error`.
    pub fn envelope(&self) -> Option<&'a Envelope> {
        self.envelope
    }

    pub fn error(&self) -> Option<&'a BusError> {
        self.error
    }
}

/// Stop handle shared by the worker, its listeners and its thread.
#[derive(Debug, Clone, Default)]
pub struct WorkerControl {
    stop: Arc<AtomicBool>,
}

impl WorkerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop. Takes effect at the next loop check; an
    /// in-flight message is finished first.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
