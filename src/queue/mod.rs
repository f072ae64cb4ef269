//! Broker contracts.
//!
//! ```text
//!   QueueCommandBus ──publish──►  broker  ──get──► Worker
//!                                   ▲               │
//!                                   └─ack / reject──┘
//! ```
//!
//! The physical broker lives outside the bus. It is responsible for
//! honouring `retry-count` / `retry-delay` on reject. [`InMemoryQueue`]
//! does so in-process.

mod in_memory;

use std::sync::Arc;

use crate::error::{BusError, Result};
use crate::message::Envelope;

pub use in_memory::InMemoryQueue;

/// Consuming side of a broker.
pub trait MessageConsumer: Send + Sync {
    /// Fetch the next message, if any.
    fn get(&self) -> Result<Option<Envelope>>;

    fn ack(&self, envelope: &Envelope) -> Result<()>;

    /// Give the message back. An envelope carrying `retry-count` is
    /// requeued, any other one is rejected for good.
    fn reject(&self, envelope: Envelope, cause: Option<&BusError>) -> Result<()>;
}

/// Publishing side of a broker.
pub trait MessagePublisher: Send + Sync {
    fn publish(&self, envelope: Envelope) -> Result<()>;
}

impl<T: MessageConsumer + ?Sized> MessageConsumer for Arc<T> {
    fn get(&self) -> Result<Option<Envelope>> {
        (**self).get()
    }

    fn ack(&self, envelope: &Envelope) -> Result<()> {
        (**self).ack(envelope)
    }

    fn reject(&self, envelope: Envelope, cause: Option<&BusError>) -> Result<()> {
        (**self).reject(envelope, cause)
    }
}

impl<T: MessagePublisher + ?Sized> MessagePublisher for Arc<T> {
    fn publish(&self, envelope: Envelope) -> Result<()> {
        (**self).publish(envelope)
    }
}
