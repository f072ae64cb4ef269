//! Registry: resolution into dispatch tables and listener matching.

use std::sync::{Arc, Mutex};

use corebus::event_bus::EventBus;
use corebus::types::{HandlerAttribute, HandlerDescriptor, MethodDescriptor, ParameterDescriptor};
use corebus::{BusError, DispatchTable, HandlerResolver, MessageType};

use crate::support::{
    catalog, command_table, listener_bus, order_handler_descriptor, AuditLog, CancelOrder,
    Forecast, LinesAdded, OrderCancelled, OrderPlaced, PlaceOrder,
};

// ============================================================================
// Command table
// ============================================================================

#[test]
fn command_table_has_one_entry_per_command() {
    let table = command_table();

    assert_eq!(table.len(), 6);
    let reference = table.lookup_first(PlaceOrder::TYPE_NAME).unwrap();
    assert_eq!(reference.handler_id, "orders");
    assert_eq!(reference.method_name, "place");
    assert_eq!(reference.parameter_name, "command");
    assert!(table.lookup_first(OrderPlaced::TYPE_NAME).is_none());
}

#[test]
fn second_handler_for_same_command_names_both() {
    let catalog = catalog();
    let mut table = command_table();
    let rival = HandlerDescriptor::new("shop.LegacyHandler").method(
        MethodDescriptor::new("doCancel")
            .param(ParameterDescriptor::named("command", CancelOrder::TYPE_NAME))
            .attribute(HandlerAttribute::command()),
    );

    let err = table
        .append_from(&HandlerResolver::commands(&catalog), &rival, "legacy")
        .unwrap_err();

    match err {
        BusError::Configuration(message) => {
            assert!(message.contains("orders::cancel"), "{message}");
            assert!(message.contains("legacy::doCancel"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn same_descriptor_resolves_to_same_table() {
    let catalog = catalog();
    let mut rebuilt = DispatchTable::commands();
    rebuilt
        .append_from(&HandlerResolver::commands(&catalog), &order_handler_descriptor(), "orders")
        .unwrap();

    assert_eq!(rebuilt, command_table());
}

#[test]
fn dumped_table_reloads_identically() {
    let table = command_table();

    let from_bytes = DispatchTable::decode(&table.encode().unwrap()).unwrap();
    let from_json = DispatchTable::from_json(&table.to_json().unwrap()).unwrap();

    assert_eq!(from_bytes, table);
    assert_eq!(from_json, table);
}

// ============================================================================
// Listener matching
// ============================================================================

fn audit() -> AuditLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn listener_on_interface_and_ancestor_both_receive() {
    let log = audit();
    let bus = listener_bus(log.clone());

    bus.notify(Arc::new(OrderPlaced { id: "o-1".into() })).unwrap();

    // Interfaces first, then the class chain.
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "onOrderEvent:shop.OrderPlaced".to_string(),
            "onOrderChanged:shop.OrderPlaced".to_string(),
        ]
    );
}

#[test]
fn listener_matches_only_related_types() {
    let log = audit();
    let bus = listener_bus(log.clone());

    bus.notify(Arc::new(LinesAdded {
        id: "o-1".into(),
        count: 2,
    }))
    .unwrap();
    bus.notify(Arc::new(OrderCancelled { id: "o-1".into() })).unwrap();
    bus.notify(Arc::new(Forecast)).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "onOrderEvent:shop.LinesAdded".to_string(),
            "onOrderChanged:shop.OrderCancelled".to_string(),
        ]
    );
}
