use std::sync::{Arc, Mutex, PoisonError};

use super::EventBus;
use crate::error::{BusError, Result};
use crate::message::{Message, MessageRef};

/// Records every event, then forwards it to the decorated bus if any.
///
/// Clones share the same record, so a test can keep a handle while the
/// bus itself is moved into a consumer.
#[derive(Clone, Default)]
pub struct RecordingEventBus {
    inner: Option<Arc<dyn EventBus>>,
    events: Arc<Mutex<Vec<MessageRef>>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decorate(inner: Arc<dyn EventBus>) -> Self {
        Self {
            inner: Some(inner),
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<MessageRef> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.message_type())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn count_of(&self, message_type: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.message_type() == message_type)
            .count()
    }

    /// First recorded event of the given concrete type.
    pub fn first_of<T: Message + Clone>(&self) -> Option<T> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find_map(|e| e.downcast_ref::<T>().cloned())
    }

    fn record(&self, event: &MessageRef) -> Result<()> {
        self.events
            .lock()
            .map_err(|e| BusError::Poisoned(e.to_string()))?
            .push(Arc::clone(event));
        Ok(())
    }

    pub fn reset(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl EventBus for RecordingEventBus {
    fn notify(&self, event: MessageRef) -> Result<()> {
        self.record(&event)?;
        match &self.inner {
            Some(inner) => inner.notify(event),
            None => Ok(()),
        }
    }

    fn notify_with(&self, event: MessageRef, sink: &dyn EventBus) -> Result<()> {
        self.record(&event)?;
        match &self.inner {
            Some(inner) => inner.notify_with(event, sink),
            None => Ok(()),
        }
    }
}
