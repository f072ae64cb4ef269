//! corebus - command and event dispatch core.
//!
//! ```text
//!  caller ─► CommandBus ─► [Authorization] ─► QueueCommandBus ─► broker
//!                                                                 │
//!            Worker ◄─────────────────────────── get ─────────────┘
//!              │
//!              ▼
//!   RetryStrategyCommandConsumerDecorator
//!              │
//!              ▼
//!   TransactionalCommandConsumer ── events ─► internal bus (now)
//!              │                         └──► buffer ─► external bus (on commit)
//!              ▼
//!   DefaultCommandConsumer ─► CommandHandlerLocator ─► DispatchTable ─► Handler
//! ```
//!
//! Messages declare their type hierarchy and policy with
//! `#[derive(Message)]`; handler methods are resolved once into a
//! [`DispatchTable`](registry::DispatchTable) by the
//! [`HandlerResolver`](registry::HandlerResolver).

extern crate self as corebus;

pub mod command_bus;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod handler;
pub mod logging;
pub mod message;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod transaction;
pub mod types;
pub mod worker;

pub use command_bus::{CommandBus, CommandBusExt, CommandConsumer, CommandResponse};
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use event_bus::EventBus;
pub use handler::{Handler, HandlerContext};
pub use message::{
    property, Envelope, Message, MessageBuilder, MessagePolicies, MessagePolicy, MessageRef,
    MessageType, MultiCommand, Properties, TypeHierarchy,
};
pub use registry::{DispatchTable, HandlerReference, HandlerResolver};
pub use retry::{DefaultRetryStrategy, RetryStrategy, RetryStrategyResponse};
pub use worker::{Worker, WorkerStats};

#[cfg(feature = "derive")]
pub use corebus_macros::Message;
