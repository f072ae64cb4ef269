use super::envelope::{property, Envelope, Properties};
use super::MessageRef;
use crate::command_bus::{CommandBus, CommandResponse};
use crate::error::{BusError, Result};

/// Fluent property setter that dispatches through a command bus.
///
/// ```ignore
/// bus.create(Arc::new(PlaceOrder { .. }))
///     .queue("orders")
///     .reply_to(true, None)?
///     .dispatch()?;
/// ```
pub struct MessageBuilder<'a> {
    bus: &'a dyn CommandBus,
    message: MessageRef,
    properties: Properties,
    sent: bool,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(bus: &'a dyn CommandBus, message: MessageRef) -> Self {
        Self {
            bus,
            message,
            properties: Properties::new(),
            sent: false,
        }
    }

    /// Queue to send to. `None` clears it.
    pub fn routing_key(mut self, routing_key: Option<&str>) -> Self {
        self.properties
            .set(property::ROUTING_KEY, routing_key.map(str::to_string));
        self
    }

    /// Alias of [`routing_key`](Self::routing_key).
    pub fn queue(self, routing_key: &str) -> Self {
        self.routing_key(Some(routing_key))
    }

    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.properties.set(property::MESSAGE_ID, Some(id.into()));
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(name, Some(value.into()));
        self
    }

    /// Ask for a reply.
    ///
    /// Without an explicit queue, one is derived from the message id
    /// (generated when missing) as `corebus.reply-to.<id>`. Disabling
    /// reply-to while naming a queue makes no sense and is refused.
    pub fn reply_to(mut self, toggle: bool, queue: Option<&str>) -> Result<Self> {
        if toggle {
            let queue = match queue {
                Some(queue) => queue.to_string(),
                None => {
                    let id = match self.properties.get(property::MESSAGE_ID) {
                        Some(id) => id.to_string(),
                        None => {
                            let id = uuid::Uuid::new_v4().to_string();
                            self.properties.set(property::MESSAGE_ID, Some(id.clone()));
                            id
                        }
                    };
                    format!("corebus.reply-to.{}", id)
                }
            };
            self.properties.set(property::REPLY_TO, Some(queue));
        } else {
            if queue.is_some() {
                return Err(BusError::Configuration(
                    "a reply-to queue name cannot be given while disabling reply-to".into(),
                ));
            }
            self.properties.set(property::REPLY_TO, None);
        }
        Ok(self)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Dispatch the message. A builder dispatches at most once.
    pub fn dispatch(&mut self) -> Result<CommandResponse> {
        if self.sent {
            return Err(BusError::AlreadySent);
        }
        self.sent = true;

        self.bus
            .dispatch(Envelope::new(self.message.clone(), self.properties.clone()))
    }
}
