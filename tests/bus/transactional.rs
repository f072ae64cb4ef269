//! Transactional consumer: buffering, rollback, batches and opt-out.

use std::sync::{Arc, Mutex};

use corebus::command_bus::PassthroughCommandBus;
use corebus::event_bus::{EventBus, ListenerEventBus, NullEventBus};
use corebus::handler::{EventListenerLocator, HandlerContainer, MethodTable};
use corebus::transaction::{InMemoryTransactionManager, TransactionOutcome};
use corebus::{
    BusError, CommandBus, CommandBusExt, CommandConsumer, DispatchTable, Envelope,
    HandlerReference, MessageRef, MultiCommand,
};

use crate::support::{
    listener_bus, ArchiveOrder, CancelOrder, Harness, OrderPlaced, PlaceOrder, Touch, Touched,
};

fn place(id: &str) -> Envelope {
    Envelope::of(PlaceOrder {
        id: id.into(),
        lines: 3,
    })
}

fn touch(id: &str, fail: bool) -> MessageRef {
    Arc::new(Touch { id: id.into(), fail })
}

#[test]
fn committed_events_reach_external_bus_in_order() {
    let harness = Harness::new();

    let response = harness.consumer.consume(place("o-1"), &NullEventBus).unwrap();

    let expected = vec!["shop.OrderPlaced", "shop.LinesAdded", "shop.OrderConfirmed"];
    assert_eq!(harness.external.event_types(), expected);
    assert_eq!(harness.internal.event_types(), expected);
    assert_eq!(harness.transactions.outcomes(), vec![TransactionOutcome::Committed]);
    assert_eq!(
        response.reply().map(|r| r.message_type()),
        Some("shop.OrderConfirmed")
    );
}

/// Records how many transactions had committed when each event arrived.
struct CommitWatcher {
    transactions: InMemoryTransactionManager,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl EventBus for CommitWatcher {
    fn notify(&self, _event: MessageRef) -> corebus::Result<()> {
        self.seen.lock().unwrap().push(self.transactions.committed());
        Ok(())
    }
}

#[test]
fn internal_bus_sees_events_before_commit() {
    let transactions = InMemoryTransactionManager::new();
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let watcher: Arc<dyn EventBus> = Arc::new(CommitWatcher {
        transactions: transactions.clone(),
        seen: Arc::clone(&seen),
    });
    let harness = Harness::with(Some(watcher), transactions);

    harness.consumer.consume(place("o-2"), &NullEventBus).unwrap();

    assert_eq!(harness.internal.count(), 3);
    assert_eq!(harness.external.count(), 3);
    assert_eq!(harness.transactions.committed(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0]);
}

#[test]
fn failure_rolls_back_and_discards_buffer() {
    let harness = Harness::new();

    let err = harness
        .consumer
        .consume(Envelope::of(CancelOrder { id: "o-3".into() }), &NullEventBus)
        .unwrap_err();

    assert!(matches!(err, BusError::Rejected(ref m) if m.contains("o-3")));
    assert_eq!(harness.external.count(), 0);
    assert_eq!(harness.internal.event_types(), vec!["shop.OrderCancelled", "shop.Touched"]);
    assert_eq!(harness.transactions.committed(), 0);
    assert_eq!(harness.transactions.rolled_back(), 1);
}

#[test]
fn no_transaction_message_never_starts_one() {
    let harness = Harness::new();

    harness
        .consumer
        .consume(Envelope::of(ArchiveOrder { id: "o-4".into() }), &NullEventBus)
        .unwrap();

    assert_eq!(harness.transactions.started(), 0);
    // Events are still delivered after the handler returns.
    assert_eq!(harness.external.first_of::<Touched>().map(|e| e.id), Some("o-4".to_string()));
}

#[test]
fn batch_commits_once_and_flushes_every_event() {
    let harness = Harness::new();
    let batch = MultiCommand::new([touch("a", false), touch("b", false), touch("c", false)]);

    harness.consumer.consume(Envelope::of(batch), &NullEventBus).unwrap();

    assert_eq!(harness.transactions.started(), 1);
    assert_eq!(harness.transactions.committed(), 1);
    assert_eq!(harness.external.count_of("shop.Touched"), 3);
}

#[test]
fn batch_failure_rolls_back_whole_batch() {
    let harness = Harness::new();
    let batch = MultiCommand::new([touch("a", false), touch("b", true), touch("c", false)]);

    let err = harness.consumer.consume(Envelope::of(batch), &NullEventBus).unwrap_err();

    assert!(matches!(err, BusError::Rejected(_)));
    assert_eq!(harness.external.count(), 0);
    // The third command never ran.
    assert_eq!(harness.internal.count(), 2);
    assert_eq!(harness.transactions.rolled_back(), 1);
}

#[test]
fn batch_ignores_no_transaction_of_its_children() {
    let harness = Harness::new();
    let batch = MultiCommand::default()
        .push(ArchiveOrder { id: "a".into() })
        .push(ArchiveOrder { id: "b".into() });

    harness.consumer.consume(Envelope::of(batch), &NullEventBus).unwrap();

    assert_eq!(harness.transactions.started(), 1);
    assert_eq!(harness.external.count(), 2);
}

#[test]
fn commit_failure_is_returned_and_discards_events() {
    let harness = Harness::new();
    harness.transactions.fail_commits(1, "could not serialize access");

    let err = harness.consumer.consume(place("o-5"), &NullEventBus).unwrap_err();

    assert!(err.is_serialization_failure());
    assert_eq!(harness.external.count(), 0);
    assert_eq!(harness.transactions.rolled_back(), 1);
}

#[test]
fn synchronous_bus_surfaces_handler_errors() {
    let harness = Harness::new();
    let bus = PassthroughCommandBus::new(harness.consumer.clone(), Arc::new(NullEventBus));

    assert!(bus.dispatch(place("o-6")).is_ok());
    assert!(matches!(
        bus.send(CancelOrder { id: "o-7".into() }),
        Err(BusError::Rejected(_))
    ));
    assert!(matches!(
        bus.send(OrderPlaced { id: "o-8".into() }),
        Err(BusError::HandlerNotFound(ref t)) if t == "shop.OrderPlaced"
    ));
}

#[test]
fn internal_listeners_run_inside_the_invocation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let listeners: Arc<dyn EventBus> = Arc::new(listener_bus(log.clone()));
    let harness = Harness::with_internal(listeners);

    harness.consumer.consume(place("o-9"), &NullEventBus).unwrap();

    assert_eq!(log.lock().unwrap().len(), 4);
}

/// Touches every placed order, the way a stock listener would.
fn touching_listener_bus() -> ListenerEventBus {
    let mut table = DispatchTable::events();
    table
        .append(HandlerReference::new("shop.OrderPlaced", "stock", "onPlaced", "event"))
        .unwrap();
    let container = HandlerContainer::new().with(
        "stock",
        MethodTable::new().method("onPlaced", |ctx| {
            let placed = ctx.message::<OrderPlaced>()?;
            ctx.notify(Touched { id: placed.id.clone() })?;
            Ok(None)
        }),
    );
    ListenerEventBus::new(EventListenerLocator::new(table, container))
}

#[test]
fn events_raised_by_internal_listeners_are_flushed() {
    let harness = Harness::with_internal(Arc::new(touching_listener_bus()));

    harness.consumer.consume(place("o-10"), &NullEventBus).unwrap();

    assert_eq!(harness.external.count_of("shop.Touched"), 1);
    assert_eq!(harness.external.count(), 4);
    assert_eq!(harness.internal.count_of("shop.Touched"), 1);
}

#[test]
fn events_raised_by_internal_listeners_are_discarded_on_failure() {
    let harness = Harness::with_internal(Arc::new(touching_listener_bus()));
    harness.transactions.fail_commits(1, "could not serialize access");

    assert!(harness.consumer.consume(place("o-11"), &NullEventBus).is_err());

    assert_eq!(harness.internal.count_of("shop.Touched"), 1);
    assert_eq!(harness.external.count(), 0);
}
