//! Event bus - fan-out of events to listeners.
//!
//! Two buses are usually wired: the *internal* one runs listeners
//! synchronously in the same call stack, the *external* one receives
//! events only once the transaction that raised them has committed.
//! The [`EventBuffer`] sits between the two.

mod buffer;
mod listener;
mod recording;

use std::sync::Arc;

use crate::error::Result;
use crate::message::MessageRef;

pub use buffer::{BufferState, EventBuffer};
pub use listener::ListenerEventBus;
pub use recording::RecordingEventBus;

/// Receives events.
pub trait EventBus: Send + Sync {
    fn notify(&self, event: MessageRef) -> Result<()>;

    /// Notify, handing `sink` to listeners as the bus for the events they
    /// raise in turn. Buses without listeners ignore `sink`.
    fn notify_with(&self, event: MessageRef, sink: &dyn EventBus) -> Result<()> {
        let _ = sink;
        self.notify(event)
    }
}

impl<T: EventBus + ?Sized> EventBus for Arc<T> {
    fn notify(&self, event: MessageRef) -> Result<()> {
        (**self).notify(event)
    }

    fn notify_with(&self, event: MessageRef, sink: &dyn EventBus) -> Result<()> {
        (**self).notify_with(event, sink)
    }
}

impl<T: EventBus + ?Sized> EventBus for &T {
    fn notify(&self, event: MessageRef) -> Result<()> {
        (**self).notify(event)
    }

    fn notify_with(&self, event: MessageRef, sink: &dyn EventBus) -> Result<()> {
        (**self).notify_with(event, sink)
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn notify(&self, _event: MessageRef) -> Result<()> {
        Ok(())
    }
}
