use crate::error::{BusError, Result};
use crate::message::MessageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Open,
    Flushed,
    Discarded,
}

/// Events raised during one transaction, waiting for its outcome.
///
/// Single use: once flushed or discarded, `add` fails with
/// [`BusError::BufferClosed`].
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<MessageRef>,
    state: BufferState,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            state: BufferState::Open,
        }
    }

    pub fn add(&mut self, event: MessageRef) -> Result<()> {
        if self.state != BufferState::Open {
            return Err(BusError::BufferClosed);
        }
        self.events.push(event);
        Ok(())
    }

    /// Close the buffer and hand back its events in the order they were added.
    pub fn flush(&mut self) -> Result<Vec<MessageRef>> {
        if self.state != BufferState::Open {
            return Err(BusError::BufferClosed);
        }
        self.state = BufferState::Flushed;
        Ok(std::mem::take(&mut self.events))
    }

    /// Close the buffer and drop its events.
    pub fn discard(&mut self) {
        self.state = BufferState::Discarded;
        self.events.clear();
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == BufferState::Open
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
