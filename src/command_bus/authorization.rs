use std::sync::Arc;

use tracing::warn;

use super::{CommandBus, CommandResponse};
use crate::error::{BusError, Result};
use crate::message::Envelope;

/// Decides whether the current caller may dispatch a command.
pub trait CommandAuthorizationChecker: Send + Sync {
    fn is_granted(&self, envelope: &Envelope) -> bool;
}

impl<F> CommandAuthorizationChecker for F
where
    F: Fn(&Envelope) -> bool + Send + Sync,
{
    fn is_granted(&self, envelope: &Envelope) -> bool {
        self(envelope)
    }
}

/// Grants when any checker grants. An empty chain grants everything.
#[derive(Default, Clone)]
pub struct CommandAuthorizationCheckerChain {
    checkers: Vec<Arc<dyn CommandAuthorizationChecker>>,
}

impl CommandAuthorizationCheckerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, checker: Arc<dyn CommandAuthorizationChecker>) -> Self {
        self.checkers.push(checker);
        self
    }
}

impl CommandAuthorizationChecker for CommandAuthorizationCheckerChain {
    fn is_granted(&self, envelope: &Envelope) -> bool {
        self.checkers.is_empty() || self.checkers.iter().any(|c| c.is_granted(envelope))
    }
}

/// Refuses unauthorized commands before they reach the decorated bus.
pub struct AuthorizationCommandBusDecorator {
    checker: Arc<dyn CommandAuthorizationChecker>,
    decorated: Arc<dyn CommandBus>,
}

impl AuthorizationCommandBusDecorator {
    pub fn new(checker: Arc<dyn CommandAuthorizationChecker>, decorated: Arc<dyn CommandBus>) -> Self {
        Self { checker, decorated }
    }
}

impl CommandBus for AuthorizationCommandBusDecorator {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse> {
        if !self.checker.is_granted(&envelope) {
            warn!(command = envelope.message_type(), "Command is not authorized");
            return Err(BusError::Unauthorized(envelope.message_type().to_string()));
        }
        self.decorated.dispatch(envelope)
    }
}
