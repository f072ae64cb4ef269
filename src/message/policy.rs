use std::collections::HashMap;
use std::sync::RwLock;

use super::Message;
use crate::error::{BusError, Result};

/// Per-type policy flags.
///
/// Declared once per message type (usually through `#[message(...)]`)
/// and read by the transactional consumer, the retry strategy and the
/// queue bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagePolicy {
    /// Run the handler without an external transaction. Ignored for
    /// messages nested in a `MultiCommand`.
    pub no_transaction: bool,
    /// Once handled, the command is also notified as an event.
    pub command_as_event: bool,
    /// Maximum retry attempts for this message type.
    pub retry_count: Option<u32>,
    /// Default routing key when dispatched asynchronously.
    pub routing_key: Option<&'static str>,
}

impl MessagePolicy {
    pub const fn new() -> Self {
        Self {
            no_transaction: false,
            command_as_event: false,
            retry_count: None,
            routing_key: None,
        }
    }

    pub const fn no_transaction(mut self) -> Self {
        self.no_transaction = true;
        self
    }

    pub const fn command_as_event(mut self) -> Self {
        self.command_as_event = true;
        self
    }

    pub const fn retry(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub const fn routing_key(mut self, key: &'static str) -> Self {
        self.routing_key = Some(key);
        self
    }
}

/// Policy lookup keyed by message type.
///
/// The first lookup for a type caches the policy the message declares;
/// explicit overrides win over declarations.
#[derive(Default)]
pub struct MessagePolicies {
    overrides: HashMap<String, MessagePolicy>,
    cache: RwLock<HashMap<&'static str, MessagePolicy>>,
}

impl MessagePolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a policy for a type, ignoring what the type declares.
    pub fn with_override(mut self, message_type: impl Into<String>, policy: MessagePolicy) -> Self {
        self.overrides.insert(message_type.into(), policy);
        self
    }

    pub fn policy_for(&self, message: &dyn Message) -> Result<MessagePolicy> {
        let message_type = message.message_type();
        if let Some(policy) = self.overrides.get(message_type) {
            return Ok(*policy);
        }

        if let Some(policy) = self
            .cache
            .read()
            .map_err(|e| BusError::Poisoned(e.to_string()))?
            .get(message_type)
        {
            return Ok(*policy);
        }

        let policy = message.policy();
        self.cache
            .write()
            .map_err(|e| BusError::Poisoned(e.to_string()))?
            .insert(message_type, policy);
        Ok(policy)
    }
}
