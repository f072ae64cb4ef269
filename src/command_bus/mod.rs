//! Command bus - dispatching and consuming commands.
//!
//! A [`CommandBus`] is what callers dispatch to; a [`CommandConsumer`]
//! actually runs the handler. Every decorator implements one of the two
//! traits and wraps an inner implementation, so a chain is assembled by
//! hand at startup:
//!
//! ```text
//! Worker ─► RetryStrategyCommandConsumerDecorator
//!              └► TransactionalCommandConsumer
//!                    └► ReplyToCommandConsumer
//!                          └► DefaultCommandConsumer ─► handler
//! ```

mod authorization;
mod consumer;
mod passthrough;
mod queue;
mod reply_to;
mod testing;
mod transactional;

use std::sync::Arc;

use crate::error::Result;
use crate::event_bus::EventBus;
use crate::message::{Envelope, Message, MessageBuilder, MessageRef, Properties};

pub use authorization::{
    AuthorizationCommandBusDecorator, CommandAuthorizationChecker, CommandAuthorizationCheckerChain,
};
pub use consumer::{DefaultCommandConsumer, NullCommandConsumer};
pub use passthrough::PassthroughCommandBus;
pub use queue::QueueCommandBus;
pub use reply_to::ReplyToCommandConsumer;
pub use testing::TestingCommandBus;
pub use transactional::TransactionalCommandConsumer;

/// Outcome of a dispatch.
#[derive(Debug, Clone)]
pub enum CommandResponse {
    /// Handled synchronously, with the handler's reply if any.
    Completed(Option<MessageRef>),
    /// Handed to the broker. Carries the properties it was sent with.
    Queued(Properties),
}

impl CommandResponse {
    pub fn completed() -> Self {
        CommandResponse::Completed(None)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, CommandResponse::Queued(_))
    }

    pub fn reply(&self) -> Option<&MessageRef> {
        match self {
            CommandResponse::Completed(reply) => reply.as_ref(),
            CommandResponse::Queued(_) => None,
        }
    }
}

/// Entry point for callers.
pub trait CommandBus: Send + Sync {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse>;
}

/// Runs a command.
///
/// `events` is where the handler's events go for this invocation.
pub trait CommandConsumer: Send + Sync {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse>;
}

impl<T: CommandBus + ?Sized> CommandBus for Arc<T> {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse> {
        (**self).dispatch(envelope)
    }
}

impl<T: CommandConsumer + ?Sized> CommandConsumer for Arc<T> {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse> {
        (**self).consume(envelope, events)
    }
}

impl<T: CommandConsumer + ?Sized> CommandConsumer for Box<T> {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse> {
        (**self).consume(envelope, events)
    }
}

/// Convenience methods over any command bus.
pub trait CommandBusExt {
    /// Start a [`MessageBuilder`] for `message`.
    fn create(&self, message: MessageRef) -> MessageBuilder<'_>;

    /// Dispatch a bare message.
    fn send<M: Message>(&self, message: M) -> Result<CommandResponse>;
}

impl<T: CommandBus> CommandBusExt for T {
    fn create(&self, message: MessageRef) -> MessageBuilder<'_> {
        MessageBuilder::new(self, message)
    }

    fn send<M: Message>(&self, message: M) -> Result<CommandResponse> {
        self.dispatch(Envelope::of(message))
    }
}

impl CommandBusExt for dyn CommandBus {
    fn create(&self, message: MessageRef) -> MessageBuilder<'_> {
        MessageBuilder::new(self, message)
    }

    fn send<M: Message>(&self, message: M) -> Result<CommandResponse> {
        self.dispatch(Envelope::of(message))
    }
}
