use std::sync::Arc;

use super::{ArgumentResolver, Arguments, Handler, HandlerContainer, HandlerContext};
use crate::error::{BusError, Result};
use crate::event_bus::EventBus;
use crate::message::{Message, MessageRef};
use crate::registry::{DispatchTable, HandlerReference};

/// A handler method ready to be called with one message.
pub struct Callable {
    handler: Arc<dyn Handler>,
    reference: HandlerReference,
    arguments: Arguments,
}

impl Callable {
    pub fn reference(&self) -> &HandlerReference {
        &self.reference
    }

    pub fn call(&self, message: &MessageRef, events: &dyn EventBus) -> Result<Option<MessageRef>> {
        let ctx = HandlerContext::new(message, &self.reference, &self.arguments, events);
        self.handler.invoke(&self.reference.method_name, &ctx)
    }
}

struct Locator {
    table: DispatchTable,
    container: HandlerContainer,
    resolver: Option<Arc<dyn ArgumentResolver>>,
}

impl Locator {
    fn callable(&self, reference: &HandlerReference, message: &MessageRef) -> Result<Callable> {
        let arguments = if reference.requires_argument_resolution {
            match &self.resolver {
                Some(resolver) => resolver.resolve(reference, message)?,
                None => {
                    return Err(BusError::Configuration(format!(
                        "{} requires argument resolution but no argument resolver is set",
                        reference
                    )))
                }
            }
        } else {
            Arguments::new()
        };

        Ok(Callable {
            handler: self.container.get(&reference.handler_id)?,
            reference: reference.clone(),
            arguments,
        })
    }
}

/// Finds the single handler of a command.
pub struct CommandHandlerLocator {
    inner: Locator,
}

impl CommandHandlerLocator {
    pub fn new(table: DispatchTable, container: HandlerContainer) -> Self {
        Self {
            inner: Locator {
                table,
                container,
                resolver: None,
            },
        }
    }

    pub fn with_argument_resolver(mut self, resolver: Arc<dyn ArgumentResolver>) -> Self {
        self.inner.resolver = Some(resolver);
        self
    }

    pub fn find(&self, command: &MessageRef) -> Result<Callable> {
        let message_type = command.message_type();
        match self.inner.table.lookup_first(message_type) {
            Some(reference) => self.inner.callable(reference, command),
            None => Err(BusError::HandlerNotFound(message_type.to_string())),
        }
    }
}

/// Finds every listener of an event, supertype listeners included.
pub struct EventListenerLocator {
    inner: Locator,
}

impl EventListenerLocator {
    pub fn new(table: DispatchTable, container: HandlerContainer) -> Self {
        Self {
            inner: Locator {
                table,
                container,
                resolver: None,
            },
        }
    }

    pub fn with_argument_resolver(mut self, resolver: Arc<dyn ArgumentResolver>) -> Self {
        self.inner.resolver = Some(resolver);
        self
    }

    pub fn find(&self, event: &MessageRef) -> Result<Vec<Callable>> {
        let message: &dyn Message = &**event;
        self.inner
            .table
            .lookup_all_for(message)
            .into_iter()
            .map(|reference| self.inner.callable(reference, event))
            .collect()
    }
}
