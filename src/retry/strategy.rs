use std::sync::Arc;

use super::{RetryStrategy, RetryStrategyResponse, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_MAX};
use crate::config::RetryConfig;
use crate::error::BusError;
use crate::message::{Envelope, MessagePolicies};

/// Retries transaction serialization failures and errors marked
/// retryable; rejects everything else.
///
/// A message type declaring its own retry count overrides the configured
/// maximum.
pub struct DefaultRetryStrategy {
    retry_without_requeue_on_transaction_failure: bool,
    max_count: u64,
    delay: u64,
    policies: Arc<MessagePolicies>,
}

impl Default for DefaultRetryStrategy {
    fn default() -> Self {
        Self::new(true, DEFAULT_RETRY_MAX)
    }
}

impl DefaultRetryStrategy {
    pub fn new(retry_without_requeue_on_transaction_failure: bool, max_count: u64) -> Self {
        Self {
            retry_without_requeue_on_transaction_failure,
            max_count,
            delay: DEFAULT_RETRY_DELAY,
            policies: Arc::new(MessagePolicies::new()),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.retry_without_requeue_on_transaction_failure, config.max_count).with_delay(config.delay_ms)
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_policies(mut self, policies: Arc<MessagePolicies>) -> Self {
        self.policies = policies;
        self
    }

    fn max_count_for(&self, envelope: &Envelope) -> u64 {
        self.policies
            .policy_for(&**envelope.message())
            .ok()
            .and_then(|p| p.retry_count)
            .map_or(self.max_count, u64::from)
    }
}

impl RetryStrategy for DefaultRetryStrategy {
    fn classify(&self, envelope: &Envelope, error: &BusError) -> RetryStrategyResponse {
        let response = if error.is_serialization_failure() {
            if self.retry_without_requeue_on_transaction_failure {
                RetryStrategyResponse::retry_without_requeue("Transaction serialization failure")
            } else {
                RetryStrategyResponse::retry("Transaction serialization failure")
            }
        } else if error.is_retryable() {
            RetryStrategyResponse::retry("Retryable failure")
        } else {
            return RetryStrategyResponse::reject(error.to_string());
        };

        response
            .with_max_count(self.max_count_for(envelope))
            .with_delay(self.delay)
    }
}
