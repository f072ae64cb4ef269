use std::sync::{Arc, Mutex, PoisonError};

use super::{CommandBus, CommandResponse};
use crate::error::{BusError, Result};
use crate::message::Envelope;

/// Records dispatched commands without running them.
///
/// Every dispatch answers `Queued`. Clones share the same record.
#[derive(Clone, Default)]
pub struct TestingCommandBus {
    commands: Arc<Mutex<Vec<Envelope>>>,
}

impl TestingCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Envelope> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self) -> usize {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of commands whose type or supertypes include `message_type`.
    pub fn count_instance_of(&self, message_type: &str) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.message().hierarchy().candidates().iter().any(|c| *c == message_type))
            .count()
    }

    pub fn get_at(&self, index: usize) -> Option<Envelope> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn first(&self) -> Option<Envelope> {
        self.get_at(0)
    }

    pub fn last(&self) -> Option<Envelope> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn reset(&self) {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl CommandBus for TestingCommandBus {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse> {
        let properties = envelope.properties().clone();
        self.commands
            .lock()
            .map_err(|e| BusError::Poisoned(e.to_string()))?
            .push(envelope);
        Ok(CommandResponse::Queued(properties))
    }
}
