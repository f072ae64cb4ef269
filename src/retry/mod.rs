//! Retry strategy - what to do with a failed message.
//!
//! A [`RetryStrategy`] classifies a failure into a [`RetryStrategyResponse`];
//! the [`RetryStrategyCommandConsumerDecorator`] acts on it, retrying in
//! process, requeuing through the broker with backoff, or rejecting.

mod decorator;
mod strategy;

use crate::error::BusError;
use crate::message::Envelope;

pub use decorator::{RetryStrategyCommandConsumerDecorator, MAX_LOCAL_ATTEMPTS};
pub use strategy::DefaultRetryStrategy;

/// Base delay between two deliveries, in milliseconds.
pub const DEFAULT_RETRY_DELAY: u64 = 100;
pub const DEFAULT_RETRY_MAX: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give the message back to the broker for a later delivery.
    Retry,
    /// Try again right away, in process, before falling back to `Retry`.
    RetryWithoutRequeue,
    /// Reject for good.
    Reject,
}

/// Outcome of failure classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategyResponse {
    pub decision: RetryDecision,
    pub reason: String,
    /// Base delay in milliseconds, multiplied by the attempt number.
    pub delay: u64,
    pub max_count: u64,
}

impl RetryStrategyResponse {
    fn new(decision: RetryDecision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            delay: DEFAULT_RETRY_DELAY,
            max_count: DEFAULT_RETRY_MAX,
        }
    }

    pub fn retry(reason: impl Into<String>) -> Self {
        Self::new(RetryDecision::Retry, reason)
    }

    pub fn retry_without_requeue(reason: impl Into<String>) -> Self {
        Self::new(RetryDecision::RetryWithoutRequeue, reason)
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self::new(RetryDecision::Reject, reason)
    }

    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn should_retry(&self) -> bool {
        self.decision != RetryDecision::Reject
    }
}

pub trait RetryStrategy: Send + Sync {
    fn classify(&self, envelope: &Envelope, error: &BusError) -> RetryStrategyResponse;
}

impl<F> RetryStrategy for F
where
    F: Fn(&Envelope, &BusError) -> RetryStrategyResponse + Send + Sync,
{
    fn classify(&self, envelope: &Envelope, error: &BusError) -> RetryStrategyResponse {
        self(envelope, error)
    }
}
