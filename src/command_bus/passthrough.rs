use std::sync::Arc;

use super::{CommandBus, CommandConsumer, CommandResponse};
use crate::error::Result;
use crate::event_bus::EventBus;
use crate::message::Envelope;

/// Synchronous bus: dispatch runs the consumer chain right away.
pub struct PassthroughCommandBus {
    consumer: Arc<dyn CommandConsumer>,
    events: Arc<dyn EventBus>,
}

impl PassthroughCommandBus {
    pub fn new(consumer: Arc<dyn CommandConsumer>, events: Arc<dyn EventBus>) -> Self {
        Self { consumer, events }
    }
}

impl CommandBus for PassthroughCommandBus {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse> {
        self.consumer.consume(envelope, &*self.events)
    }
}
