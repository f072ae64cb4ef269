//! Retry decorator decisions against the in-memory broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use corebus::config::RetryConfig;
use corebus::event_bus::NullEventBus;
use corebus::message::property;
use corebus::queue::{InMemoryQueue, MessageConsumer, MessagePublisher};
use corebus::retry::{RetryStrategyCommandConsumerDecorator, MAX_LOCAL_ATTEMPTS};
use corebus::{
    BusError, CommandConsumer, DefaultRetryStrategy, Envelope, RetryStrategy,
    RetryStrategyResponse,
};

use crate::support::{Harness, PlaceOrder, RecountStock, ReserveStock};

/// Publish then fetch, so the envelope is in flight like a worker would see it.
fn deliver(queue: &InMemoryQueue, envelope: Envelope) -> Envelope {
    queue.publish(envelope).unwrap();
    queue.get().unwrap().unwrap()
}

fn decorate(
    harness: &Harness,
    strategy: Arc<dyn RetryStrategy>,
    queue: &InMemoryQueue,
) -> RetryStrategyCommandConsumerDecorator {
    RetryStrategyCommandConsumerDecorator::new(harness.consumer.clone(), strategy, Arc::new(queue.clone()))
}

#[test]
fn exhausted_budget_rejects_instead_of_requeuing() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    let consumer = decorate(&harness, Arc::new(DefaultRetryStrategy::new(true, 4)), &queue);

    let envelope = deliver(
        &queue,
        Envelope::of(ReserveStock).with_property(property::RETRY_COUNT, "4"),
    );
    let err = consumer.consume(envelope, &NullEventBus).unwrap_err();

    assert!(err.is_retryable());
    assert!(queue.requeued().is_empty());
    let dead = queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert!(!dead[0].has_property(property::RETRY_COUNT));
}

#[test]
fn serialization_failure_retries_locally_then_requeues() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    let config = RetryConfig {
        max_count: 7,
        ..RetryConfig::default()
    };
    let consumer = decorate(&harness, Arc::new(DefaultRetryStrategy::from_config(&config)), &queue);

    let envelope = deliver(&queue, Envelope::of(RecountStock));
    let err = consumer.consume(envelope, &NullEventBus).unwrap_err();

    assert!(err.is_serialization_failure());
    assert_eq!(harness.calls.get(), 7);
    assert_eq!(harness.transactions.rolled_back(), 7);

    let requeued = queue.requeued();
    assert_eq!(requeued.len(), 1);
    assert_eq!(requeued[0].property(property::RETRY_COUNT), Some("1"));
    assert_eq!(requeued[0].property(property::RETRY_DELAY), Some("100"));
    assert_eq!(requeued[0].property(property::RETRY_MAX), Some("7"));
    assert_eq!(
        requeued[0].property(property::RETRY_REASON),
        Some("Transaction serialization failure")
    );
}

#[test]
fn local_attempts_never_exceed_hard_bound() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    let consumer = decorate(&harness, Arc::new(DefaultRetryStrategy::new(true, 25)), &queue);

    let envelope = deliver(&queue, Envelope::of(RecountStock));
    let _ = consumer.consume(envelope, &NullEventBus);

    assert_eq!(harness.calls.get() as u64, MAX_LOCAL_ATTEMPTS);
    assert_eq!(queue.requeued()[0].retry_max(), Some(25));
}

#[test]
fn transient_commit_failure_recovers_in_process() {
    let harness = Harness::new();
    harness.transactions.fail_commits(2, "could not serialize access");
    let queue = InMemoryQueue::new();
    let consumer = decorate(&harness, Arc::new(DefaultRetryStrategy::default()), &queue);

    let envelope = deliver(
        &queue,
        Envelope::of(PlaceOrder {
            id: "o-1".into(),
            lines: 1,
        }),
    );
    consumer.consume(envelope, &NullEventBus).unwrap();

    assert_eq!(harness.calls.get(), 3);
    // Each failed attempt notified internally; only the last one flushed.
    assert_eq!(harness.internal.count(), 9);
    assert_eq!(harness.external.count(), 3);
    assert!(queue.requeued().is_empty());
}

#[test]
fn kill_switch_bypasses_strategy_and_broker() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    let classified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&classified);
    let strategy: Arc<dyn RetryStrategy> = Arc::new(move |_: &Envelope, _: &BusError| {
        counter.fetch_add(1, Ordering::SeqCst);
        RetryStrategyResponse::retry("should not happen")
    });
    let consumer = decorate(&harness, strategy, &queue);

    let envelope = deliver(
        &queue,
        Envelope::of(ReserveStock).with_property(property::RETRY_KILLSWITCH, "1"),
    );
    let err = consumer.consume(envelope, &NullEventBus).unwrap_err();

    assert!(matches!(err, BusError::Retryable(_)));
    assert_eq!(harness.calls.get(), 1);
    assert_eq!(classified.load(Ordering::SeqCst), 0);
    assert!(queue.requeued().is_empty());
    assert!(queue.dead_letters().is_empty());
    assert_eq!(queue.in_flight(), 1);
}

#[test]
fn requeued_message_is_redelivered_after_its_delay() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    let strategy = DefaultRetryStrategy::new(false, 3).with_delay(0);
    let consumer = decorate(&harness, Arc::new(strategy), &queue);

    let first = deliver(&queue, Envelope::of(ReserveStock));
    let _ = consumer.consume(first, &NullEventBus);

    let second = queue.get().unwrap().expect("requeued message");
    assert_eq!(second.retry_count(), Some(1));
    let _ = consumer.consume(second, &NullEventBus);

    let third = queue.get().unwrap().expect("requeued message");
    assert_eq!(third.retry_count(), Some(2));
}
