//! Messages - commands and events as runtime-typed values.
//!
//! The bus routes on the *runtime* type of a message. Rust has no class
//! hierarchy to walk, so every message describes itself: its own type
//! name, the interfaces it implements and its ancestor chain. The
//! `#[derive(Message)]` macro generates all of it from attributes:
//!
//! ```ignore
//! use corebus::Message;
//!
//! #[derive(Debug, Clone, Message)]
//! #[message(name = "shop.PlaceOrder", no_transaction, retry = 4)]
//! pub struct PlaceOrder {
//!     pub order_id: String,
//! }
//!
//! #[derive(Debug, Clone, Message)]
//! #[message(name = "shop.OrderPlaced", implements("shop.OrderEvent"), extends("shop.DomainEvent"))]
//! pub struct OrderPlaced {
//!     pub order_id: String,
//! }
//! ```

mod builder;
mod envelope;
mod multi;
mod policy;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use builder::MessageBuilder;
pub use envelope::{property, Envelope, Properties};
pub use multi::MultiCommand;
pub use policy::{MessagePolicies, MessagePolicy};

/// Shared handle on a message. Events are fanned out to several buses,
/// so messages travel by reference count instead of by value.
pub type MessageRef = Arc<dyn Message>;

/// A command or an event.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Fully-qualified type name used as the dispatch key.
    fn message_type(&self) -> &'static str;

    /// Interfaces this type implements, transitively.
    fn interfaces(&self) -> &'static [&'static str] {
        &[]
    }

    /// Ancestor chain, nearest parent first.
    fn ancestors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Static per-type policy flags.
    fn policy(&self) -> MessagePolicy {
        MessagePolicy::default()
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Message {
    /// Downcast to the concrete message type.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Type hierarchy used for supertype matching.
    pub fn hierarchy(&self) -> TypeHierarchy<'static> {
        TypeHierarchy {
            type_name: self.message_type(),
            interfaces: self.interfaces(),
            ancestors: self.ancestors(),
        }
    }
}

/// Static description of a message type, available without an instance.
///
/// Implemented by `#[derive(Message)]`; used to feed the type catalog.
pub trait MessageType: Message + Sized {
    const TYPE_NAME: &'static str;
    const INTERFACES: &'static [&'static str];
    const ANCESTORS: &'static [&'static str];
    const POLICY: MessagePolicy;
}

/// Borrowed view over a type's name, interfaces and ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHierarchy<'a> {
    pub type_name: &'a str,
    pub interfaces: &'a [&'a str],
    pub ancestors: &'a [&'a str],
}

impl<'a> TypeHierarchy<'a> {
    /// A type with no declared supertypes.
    pub fn exact(type_name: &'a str) -> Self {
        Self {
            type_name,
            interfaces: &[],
            ancestors: &[],
        }
    }

    /// Candidate dispatch keys: interfaces first, then the type itself
    /// followed by its ancestors, nearest first. Duplicates are dropped.
    pub fn candidates(&self) -> Vec<&'a str> {
        let mut keys: Vec<&'a str> = Vec::with_capacity(1 + self.interfaces.len() + self.ancestors.len());
        let chain = std::iter::once(self.type_name).chain(self.ancestors.iter().copied());
        for key in self.interfaces.iter().copied().chain(chain) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
