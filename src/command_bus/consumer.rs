use tracing::debug;

use super::{CommandConsumer, CommandResponse};
use crate::error::Result;
use crate::event_bus::EventBus;
use crate::handler::CommandHandlerLocator;
use crate::message::Envelope;

/// Finds the command handler and calls it.
pub struct DefaultCommandConsumer {
    locator: CommandHandlerLocator,
}

impl DefaultCommandConsumer {
    pub fn new(locator: CommandHandlerLocator) -> Self {
        Self { locator }
    }
}

impl CommandConsumer for DefaultCommandConsumer {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse> {
        let command = envelope.message();
        let callable = self.locator.find(command)?;
        debug!(handler = %callable.reference(), "Consuming command");

        let reply = callable.call(command, events)?;
        Ok(CommandResponse::Completed(reply))
    }
}

/// Accepts every command and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCommandConsumer;

impl CommandConsumer for NullCommandConsumer {
    fn consume(&self, _envelope: Envelope, _events: &dyn EventBus) -> Result<CommandResponse> {
        Ok(CommandResponse::completed())
    }
}
