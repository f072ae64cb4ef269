//! Handler invocation - from a [`HandlerReference`] to an actual call.
//!
//! Handlers are registered in a [`HandlerContainer`] under the same id
//! the dispatch table references them with. A handler exposes its
//! methods by name through [`Handler::invoke`]; [`MethodTable`] builds one
//! from closures.

mod arguments;
mod locator;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BusError, Result};
use crate::event_bus::EventBus;
use crate::message::{Message, MessageRef};
use crate::registry::HandlerReference;

pub use arguments::{ArgumentResolver, Arguments};
pub use locator::{Callable, CommandHandlerLocator, EventListenerLocator};

/// Everything a handler method gets when called.
pub struct HandlerContext<'a> {
    message: &'a MessageRef,
    reference: &'a HandlerReference,
    arguments: &'a Arguments,
    events: &'a dyn EventBus,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        message: &'a MessageRef,
        reference: &'a HandlerReference,
        arguments: &'a Arguments,
        events: &'a dyn EventBus,
    ) -> Self {
        Self {
            message,
            reference,
            arguments,
            events,
        }
    }

    /// The message, downcast to the type the method expects.
    pub fn message<T: Message>(&self) -> Result<&T> {
        self.message.downcast_ref::<T>().ok_or_else(|| {
            BusError::Configuration(format!(
                "{} cannot receive a {}",
                self.reference,
                self.message.message_type()
            ))
        })
    }

    pub fn message_ref(&self) -> &MessageRef {
        self.message
    }

    pub fn reference(&self) -> &HandlerReference {
        self.reference
    }

    /// Injected argument for a non-message parameter.
    pub fn argument<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.arguments.get::<T>(name)
    }

    /// Raise an event from within the handler.
    pub fn notify<M: Message>(&self, event: M) -> Result<()> {
        self.events.notify(Arc::new(event))
    }

    pub fn notify_ref(&self, event: MessageRef) -> Result<()> {
        self.events.notify(event)
    }

    pub fn events(&self) -> &dyn EventBus {
        self.events
    }
}

/// A command handler or event listener instance.
pub trait Handler: Send + Sync {
    /// Call `method`. A command handler may return a reply.
    fn invoke(&self, method: &str, ctx: &HandlerContext<'_>) -> Result<Option<MessageRef>>;
}

type MethodFn = dyn Fn(&HandlerContext<'_>) -> Result<Option<MessageRef>> + Send + Sync;

/// Handler assembled from named closures.
///
/// ```ignore
/// let handler = MethodTable::new()
///     .method("place", |ctx| {
///         let cmd = ctx.message::<PlaceOrder>()?;
///         ctx.notify(OrderPlaced { id: cmd.id.clone() })?;
///         Ok(None)
///     });
/// ```
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, Box<MethodFn>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_>) -> Result<Option<MessageRef>> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(f));
        self
    }
}

impl Handler for MethodTable {
    fn invoke(&self, method: &str, ctx: &HandlerContext<'_>) -> Result<Option<MessageRef>> {
        match self.methods.get(method) {
            Some(f) => f(ctx),
            None => Err(BusError::Configuration(format!(
                "{} has no method {}()",
                ctx.reference().handler_id,
                method
            ))),
        }
    }
}

/// Handler instances by id.
#[derive(Default, Clone)]
pub struct HandlerContainer {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler_id: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.insert(handler_id, Arc::new(handler));
        self
    }

    pub fn insert(&mut self, handler_id: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(handler_id.into(), handler);
    }

    pub fn get(&self, handler_id: &str) -> Result<Arc<dyn Handler>> {
        self.handlers
            .get(handler_id)
            .cloned()
            .ok_or_else(|| BusError::Configuration(format!("handler '{}' is not registered", handler_id)))
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }
}
