use std::sync::Arc;

use tracing::{info, warn};

use super::{CommandBus, CommandBusExt, CommandConsumer, CommandResponse};
use crate::error::Result;
use crate::event_bus::EventBus;
use crate::message::Envelope;

/// Sends the handler reply to the queue named by `reply-to`.
pub struct ReplyToCommandConsumer {
    decorated: Arc<dyn CommandConsumer>,
    bus: Arc<dyn CommandBus>,
}

impl ReplyToCommandConsumer {
    pub fn new(decorated: Arc<dyn CommandConsumer>, bus: Arc<dyn CommandBus>) -> Self {
        Self { decorated, bus }
    }
}

impl CommandConsumer for ReplyToCommandConsumer {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse> {
        let reply_to = envelope.reply_to().map(str::to_string);
        let response = self.decorated.consume(envelope, events)?;

        let Some(queue) = reply_to else {
            return Ok(response);
        };
        match response.reply() {
            Some(reply) => {
                info!(queue = %queue, reply = reply.message_type(), "Sending reply");
                self.bus
                    .create(Arc::clone(reply))
                    .routing_key(Some(queue.as_str()))
                    .dispatch()?;
            }
            None => warn!(queue = %queue, "Cannot reply, handler returned nothing"),
        }
        Ok(response)
    }
}
