//! Envelope - a message plus its string property bag.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Message, MessageRef};

/// Well-known property names.
pub mod property {
    pub const MESSAGE_ID: &str = "message-id";
    pub const REPLY_TO: &str = "reply-to";
    pub const ROUTING_KEY: &str = "routing-key";
    pub const RETRY_COUNT: &str = "retry-count";
    pub const RETRY_DELAY: &str = "retry-delay";
    pub const RETRY_MAX: &str = "retry-max";
    pub const RETRY_REASON: &str = "retry-reason";
    pub const RETRY_KILLSWITCH: &str = "retry-killswitch";

    /// Every retry bookkeeping property, cleared on permanent reject.
    pub const RETRY_ALL: [&str; 4] = [RETRY_COUNT, RETRY_DELAY, RETRY_MAX, RETRY_REASON];
}

/// String to string property bag.
///
/// Setting an empty value removes the key, so `with` can both add and
/// clear properties in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    data: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Parse a property as an unsigned integer; unparsable values count as absent.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn has(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Set or, for `None` and empty strings, remove a property.
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match value {
            Some(value) if !value.is_empty() => {
                self.data.insert(name, value);
            }
            _ => {
                self.data.remove(&name);
            }
        }
    }

    /// Copy with the given changes applied.
    pub fn with<I, K>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let mut ret = self.clone();
        for (name, value) in changes {
            ret.set(name, value);
        }
        ret
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut ret = Properties::new();
        for (k, v) in iter {
            ret.set(k, Some(v.into()));
        }
        ret
    }
}

/// A message paired with its properties.
///
/// Envelopes are created at the bus boundary and copied with mutation
/// when retried; the wrapped message itself is never cloned.
#[derive(Debug, Clone)]
pub struct Envelope {
    message: MessageRef,
    properties: Properties,
}

impl Envelope {
    pub fn new(message: MessageRef, properties: Properties) -> Self {
        Self {
            message,
            properties,
        }
    }

    /// Wrap a message with an empty property bag.
    pub fn wrap(message: MessageRef) -> Self {
        Self::new(message, Properties::new())
    }

    /// Wrap a concrete message value.
    pub fn of<M: Message>(message: M) -> Self {
        Self::wrap(Arc::new(message))
    }

    pub fn message(&self) -> &MessageRef {
        &self.message
    }

    pub fn into_message(self) -> MessageRef {
        self.message
    }

    pub fn message_type(&self) -> &'static str {
        self.message.message_type()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.has(name)
    }

    /// Builder-style single property setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(name, Some(value.into()));
        self
    }

    /// Copy sharing the same message, with property changes applied.
    pub fn with_properties<I, K>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        Self {
            message: Arc::clone(&self.message),
            properties: self.properties.with(changes),
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.property(property::MESSAGE_ID)
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.property(property::REPLY_TO)
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.property(property::ROUTING_KEY)
    }

    pub fn retry_count(&self) -> Option<u64> {
        self.properties.get_u64(property::RETRY_COUNT)
    }

    pub fn retry_delay(&self) -> Option<u64> {
        self.properties.get_u64(property::RETRY_DELAY)
    }

    pub fn retry_max(&self) -> Option<u64> {
        self.properties.get_u64(property::RETRY_MAX)
    }
}

impl From<MessageRef> for Envelope {
    fn from(message: MessageRef) -> Self {
        Envelope::wrap(message)
    }
}
