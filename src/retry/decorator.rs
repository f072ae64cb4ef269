use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{RetryDecision, RetryStrategy, RetryStrategyResponse};
use crate::command_bus::{CommandConsumer, CommandResponse};
use crate::error::{BusError, Result};
use crate::event_bus::EventBus;
use crate::message::{property, Envelope};
use crate::queue::MessageConsumer;

/// Upper bound of in-process attempts for one delivery, whatever the
/// strategy says. Reaching it falls back to a broker requeue.
pub const MAX_LOCAL_ATTEMPTS: u64 = 10;

/// Applies a [`RetryStrategy`] around a consumer.
///
/// Failures are always returned to the caller once the broker has been
/// told what to do with the message.
pub struct RetryStrategyCommandConsumerDecorator {
    decorated: Arc<dyn CommandConsumer>,
    strategy: Arc<dyn RetryStrategy>,
    queue: Arc<dyn MessageConsumer>,
}

impl RetryStrategyCommandConsumerDecorator {
    pub fn new(
        decorated: Arc<dyn CommandConsumer>,
        strategy: Arc<dyn RetryStrategy>,
        queue: Arc<dyn MessageConsumer>,
    ) -> Self {
        Self {
            decorated,
            strategy,
            queue,
        }
    }

    fn requeue(&self, envelope: &Envelope, response: &RetryStrategyResponse, err: &BusError) {
        let count = envelope.retry_count().unwrap_or(0);
        let delay = envelope.retry_delay().unwrap_or(response.delay);
        let max = envelope.retry_max().unwrap_or(response.max_count);

        if count >= max {
            info!(
                message_type = envelope.message_type(),
                count, max, "Retry budget exhausted, rejecting"
            );
            self.reject(envelope, err);
            return;
        }

        let next = count.saturating_add(1);
        let backoff = delay.saturating_mul(next);
        let retried = envelope.with_properties([
            (property::RETRY_COUNT, Some(next.to_string())),
            (property::RETRY_DELAY, Some(backoff.to_string())),
            (property::RETRY_MAX, Some(max.to_string())),
            (property::RETRY_REASON, Some(response.reason.clone())),
        ]);

        info!(
            message_type = envelope.message_type(),
            attempt = next,
            max,
            delay_ms = backoff,
            reason = %response.reason,
            "Requeuing message"
        );
        if let Err(queue_err) = self.queue.reject(retried, Some(err)) {
            error!(error = %queue_err, "Failed to requeue message");
        }
    }

    fn reject(&self, envelope: &Envelope, err: &BusError) {
        let rejected = envelope.with_properties(property::RETRY_ALL.map(|name| (name, None::<String>)));
        warn!(message_type = envelope.message_type(), error = %err, "Rejecting message");
        if let Err(queue_err) = self.queue.reject(rejected, Some(err)) {
            error!(error = %queue_err, "Failed to reject message");
        }
    }
}

impl CommandConsumer for RetryStrategyCommandConsumerDecorator {
    fn consume(&self, envelope: Envelope, events: &dyn EventBus) -> Result<CommandResponse> {
        let mut attempt: u64 = 0;

        loop {
            let err = match self.decorated.consume(envelope.clone(), events) {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if envelope.has_property(property::RETRY_KILLSWITCH) {
                debug!(message_type = envelope.message_type(), "Kill-switch set, not retrying");
                return Err(err);
            }

            let response = self.strategy.classify(&envelope, &err);
            match response.decision {
                RetryDecision::RetryWithoutRequeue => {
                    attempt += 1;
                    let max = envelope.retry_max().unwrap_or(response.max_count);
                    if attempt < max && attempt < MAX_LOCAL_ATTEMPTS {
                        debug!(
                            message_type = envelope.message_type(),
                            attempt, max, "Retrying in process"
                        );
                        continue;
                    }
                    if attempt >= MAX_LOCAL_ATTEMPTS && attempt < max {
                        warn!(
                            message_type = envelope.message_type(),
                            attempt, max, "In-process retry bound reached"
                        );
                    }
                    self.requeue(&envelope, &response.with_max_count(max), &err);
                }
                RetryDecision::Retry => self.requeue(&envelope, &response, &err),
                RetryDecision::Reject => self.reject(&envelope, &err),
            }

            return Err(err);
        }
    }
}
