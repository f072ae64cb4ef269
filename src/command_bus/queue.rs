use std::sync::Arc;

use tracing::debug;

use super::{CommandBus, CommandResponse};
use crate::error::Result;
use crate::message::{property, Envelope, MessagePolicies};
use crate::queue::MessagePublisher;

/// Asynchronous bus: dispatch publishes to the broker.
///
/// A missing routing key is taken from the message policy; a missing
/// message id is generated so the caller can correlate replies.
pub struct QueueCommandBus {
    publisher: Arc<dyn MessagePublisher>,
    policies: Arc<MessagePolicies>,
}

impl QueueCommandBus {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self {
            publisher,
            policies: Arc::new(MessagePolicies::new()),
        }
    }

    pub fn with_policies(mut self, policies: Arc<MessagePolicies>) -> Self {
        self.policies = policies;
        self
    }
}

impl CommandBus for QueueCommandBus {
    fn dispatch(&self, envelope: Envelope) -> Result<CommandResponse> {
        let mut changes: Vec<(&str, Option<String>)> = Vec::new();
        if envelope.routing_key().is_none() {
            let policy = self.policies.policy_for(&**envelope.message())?;
            if let Some(key) = policy.routing_key {
                changes.push((property::ROUTING_KEY, Some(key.to_string())));
            }
        }
        if envelope.message_id().is_none() {
            changes.push((property::MESSAGE_ID, Some(uuid::Uuid::new_v4().to_string())));
        }
        let envelope = envelope.with_properties(changes);

        debug!(
            message_type = envelope.message_type(),
            routing_key = envelope.routing_key().unwrap_or_default(),
            "Publishing command"
        );
        let properties = envelope.properties().clone();
        self.publisher.publish(envelope)?;
        Ok(CommandResponse::Queued(properties))
    }
}
