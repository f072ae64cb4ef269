//! Worker loop lifecycle and resilience.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use corebus::queue::{InMemoryQueue, MessageConsumer, MessagePublisher};
use corebus::worker::{Worker, WorkerEventKind};
use corebus::{BusError, Envelope, Result};

use crate::support::{CancelOrder, Harness, PlaceOrder};

type EventLog = Arc<Mutex<Vec<WorkerEventKind>>>;

fn record_all(mut worker: Worker, log: &EventLog) -> Worker {
    use WorkerEventKind::*;
    for kind in [Start, Idle, Next, Done, Error, Stop] {
        let log = Arc::clone(log);
        worker = worker.on(kind, move |event, _| log.lock().unwrap().push(event.kind()));
    }
    worker
}

#[test]
fn empty_queue_idles_once_then_stops_from_idle_handler() {
    let harness = Harness::new();
    let log = EventLog::default();
    let worker = Worker::new(harness.consumer.clone(), Arc::new(InMemoryQueue::new()))
        .with_idle_sleep(Duration::from_millis(1))
        .on(WorkerEventKind::Idle, |_, control| control.stop());
    let mut worker = record_all(worker, &log);

    let stats = worker.run();

    use WorkerEventKind::*;
    assert_eq!(*log.lock().unwrap(), vec![Start, Idle, Stop]);
    assert_eq!(stats.idles, 1);
    assert_eq!(stats.messages_handled, 0);
}

/// Counts `get` calls and rejects around an in-memory queue.
#[derive(Clone, Default)]
struct CountingQueue {
    inner: InMemoryQueue,
    gets: Arc<Mutex<usize>>,
    rejects: Arc<Mutex<Vec<Option<String>>>>,
}

impl MessageConsumer for CountingQueue {
    fn get(&self) -> Result<Option<Envelope>> {
        *self.gets.lock().unwrap() += 1;
        self.inner.get()
    }

    fn ack(&self, envelope: &Envelope) -> Result<()> {
        self.inner.ack(envelope)
    }

    fn reject(&self, envelope: Envelope, cause: Option<&BusError>) -> Result<()> {
        self.rejects.lock().unwrap().push(cause.map(ToString::to_string));
        self.inner.reject(envelope, cause)
    }
}

#[test]
fn failing_message_is_rejected_and_loop_continues() {
    let harness = Harness::new();
    let queue = CountingQueue::default();
    queue.inner.publish(Envelope::of(CancelOrder { id: "o-1".into() })).unwrap();

    let log = EventLog::default();
    let worker = Worker::new(harness.consumer.clone(), Arc::new(queue.clone()))
        .with_idle_sleep(Duration::from_millis(1))
        .on(WorkerEventKind::Idle, |_, control| control.stop());
    let mut worker = record_all(worker, &log);

    let stats = worker.run();

    use WorkerEventKind::*;
    assert_eq!(*log.lock().unwrap(), vec![Start, Next, Error, Idle, Stop]);
    assert_eq!(stats.messages_failed, 1);
    assert_eq!(*queue.gets.lock().unwrap(), 2);

    let rejects = queue.rejects.lock().unwrap();
    assert_eq!(rejects.len(), 1);
    assert!(rejects[0].as_deref().unwrap_or_default().contains("already shipped"));
    assert_eq!(queue.inner.dead_letters().len(), 1);
}

#[test]
fn error_handler_can_stop_the_worker() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    queue.publish(Envelope::of(CancelOrder { id: "o-2".into() })).unwrap();
    queue
        .publish(Envelope::of(PlaceOrder {
            id: "o-3".into(),
            lines: 1,
        }))
        .unwrap();

    let seen_error = Arc::new(Mutex::new(None));
    let capture = Arc::clone(&seen_error);
    let mut worker = Worker::new(harness.consumer.clone(), Arc::new(queue.clone()))
        .with_idle_sleep(Duration::from_millis(1))
        .on(WorkerEventKind::Error, move |event, control| {
            *capture.lock().unwrap() = event.error().map(ToString::to_string);
            control.stop();
        });

    let stats = worker.run();

    assert_eq!(stats.messages_failed, 1);
    assert_eq!(stats.messages_handled, 0);
    assert_eq!(queue.len(), 1);
    assert!(seen_error.lock().unwrap().as_deref().unwrap_or_default().starts_with("rejected:"));
}

#[test]
fn successful_messages_are_acknowledged() {
    let harness = Harness::new();
    let queue = InMemoryQueue::new();
    for id in ["o-4", "o-5"] {
        queue
            .publish(Envelope::of(PlaceOrder {
                id: id.into(),
                lines: 2,
            }))
            .unwrap();
    }

    let mut worker = Worker::new(harness.consumer.clone(), Arc::new(queue.clone()))
        .with_idle_sleep(Duration::from_millis(1))
        .with_limit(2);
    let stats = worker.run();

    assert_eq!(stats.messages_handled, 2);
    assert_eq!(queue.acknowledged().len(), 2);
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(harness.external.count(), 6);
}

#[test]
fn worker_runs_only_once() {
    let harness = Harness::new();
    let mut worker = Worker::new(harness.consumer.clone(), Arc::new(InMemoryQueue::new()))
        .with_idle_sleep(Duration::from_millis(1))
        .on(WorkerEventKind::Idle, |_, control| control.stop());

    assert_eq!(worker.run().idles, 1);
    assert_eq!(worker.run().polls, 0);
}
