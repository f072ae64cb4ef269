//! Shared messages, handlers and wiring for the bus tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use corebus::command_bus::{DefaultCommandConsumer, TransactionalCommandConsumer};
use corebus::event_bus::{EventBus, ListenerEventBus, RecordingEventBus};
use corebus::handler::{CommandHandlerLocator, EventListenerLocator, HandlerContainer, MethodTable};
use corebus::transaction::InMemoryTransactionManager;
use corebus::types::{
    HandlerAttribute, HandlerDescriptor, MethodDescriptor, ParameterDescriptor, TypeCatalog,
    TypeDescriptor,
};
use corebus::{BusError, DispatchTable, HandlerResolver, Message, MessageRef, MessageType};

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Message)]
#[message(name = "shop.PlaceOrder", routing_key = "orders")]
pub struct PlaceOrder {
    pub id: String,
    pub lines: u32,
}

/// Raises two events, then fails.
#[derive(Debug, Clone, Message)]
#[message(name = "shop.CancelOrder")]
pub struct CancelOrder {
    pub id: String,
}

#[derive(Debug, Clone, Message)]
#[message(name = "shop.ArchiveOrder", no_transaction)]
pub struct ArchiveOrder {
    pub id: String,
}

/// Raises one event; fails when `fail` is set.
#[derive(Debug, Clone, Message)]
#[message(name = "shop.Touch")]
pub struct Touch {
    pub id: String,
    pub fail: bool,
}

/// Always fails with a retryable error.
#[derive(Debug, Clone, Message)]
#[message(name = "shop.ReserveStock")]
pub struct ReserveStock;

/// Always fails with a transaction serialization failure.
#[derive(Debug, Clone, Message)]
#[message(name = "shop.RecountStock")]
pub struct RecountStock;

// ============================================================================
// Events
// ============================================================================

pub const ORDER_EVENT: &str = "shop.OrderEvent";
pub const ORDER_CHANGED: &str = "shop.OrderChanged";

#[derive(Debug, Clone, Message)]
#[message(name = "shop.OrderPlaced", implements("shop.OrderEvent"), extends("shop.OrderChanged"))]
pub struct OrderPlaced {
    pub id: String,
}

#[derive(Debug, Clone, Message)]
#[message(name = "shop.LinesAdded", implements("shop.OrderEvent"))]
pub struct LinesAdded {
    pub id: String,
    pub count: u32,
}

#[derive(Debug, Clone, Message)]
#[message(name = "shop.OrderConfirmed", implements("shop.OrderEvent"))]
pub struct OrderConfirmed {
    pub id: String,
}

#[derive(Debug, Clone, Message)]
#[message(name = "shop.OrderCancelled", extends("shop.OrderChanged"))]
pub struct OrderCancelled {
    pub id: String,
}

#[derive(Debug, Clone, Message)]
#[message(name = "shop.Touched")]
pub struct Touched {
    pub id: String,
}

#[derive(Debug, Clone, Message)]
#[message(name = "weather.Forecast")]
pub struct Forecast;

// ============================================================================
// Registry
// ============================================================================

pub fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new()
        .with(TypeDescriptor::interface(ORDER_EVENT))
        .with(TypeDescriptor::class(ORDER_CHANGED));
    catalog
        .register::<PlaceOrder>()
        .register::<CancelOrder>()
        .register::<ArchiveOrder>()
        .register::<Touch>()
        .register::<ReserveStock>()
        .register::<RecountStock>()
        .register::<OrderPlaced>()
        .register::<LinesAdded>()
        .register::<OrderConfirmed>()
        .register::<OrderCancelled>()
        .register::<Touched>()
        .register::<Forecast>();
    catalog
}

fn command(method: &str, type_name: &str) -> MethodDescriptor {
    MethodDescriptor::new(method)
        .param(ParameterDescriptor::named("command", type_name))
        .attribute(HandlerAttribute::command())
}

/// Describes the order handler methods the way a registration function would.
pub fn order_handler_descriptor() -> HandlerDescriptor {
    HandlerDescriptor::new("shop.OrderHandler")
        .method(command("place", PlaceOrder::TYPE_NAME))
        .method(command("cancel", CancelOrder::TYPE_NAME))
        .method(command("archive", ArchiveOrder::TYPE_NAME))
        .method(command("touch", Touch::TYPE_NAME))
        .method(command("reserve", ReserveStock::TYPE_NAME))
        .method(command("recount", RecountStock::TYPE_NAME))
}

pub fn command_table() -> DispatchTable {
    let catalog = catalog();
    let mut table = DispatchTable::commands();
    table
        .append_from(&HandlerResolver::commands(&catalog), &order_handler_descriptor(), "orders")
        .unwrap();
    table
}

/// Counts handler invocations per command.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    count: Arc<AtomicUsize>,
}

impl Calls {
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn order_handler(calls: Calls) -> MethodTable {
    let place = calls.clone();
    let recount = calls.clone();
    let reserve = calls;

    MethodTable::new()
        .method("place", move |ctx| {
            place.hit();
            let cmd = ctx.message::<PlaceOrder>()?;
            ctx.notify(OrderPlaced { id: cmd.id.clone() })?;
            ctx.notify(LinesAdded {
                id: cmd.id.clone(),
                count: cmd.lines,
            })?;
            ctx.notify(OrderConfirmed { id: cmd.id.clone() })?;
            let reply: MessageRef = Arc::new(OrderConfirmed { id: cmd.id.clone() });
            Ok(Some(reply))
        })
        .method("cancel", |ctx| {
            let cmd = ctx.message::<CancelOrder>()?;
            ctx.notify(OrderCancelled { id: cmd.id.clone() })?;
            ctx.notify(Touched { id: cmd.id.clone() })?;
            Err(BusError::Rejected(format!("order {} is already shipped", cmd.id)))
        })
        .method("archive", |ctx| {
            let cmd = ctx.message::<ArchiveOrder>()?;
            ctx.notify(Touched { id: cmd.id.clone() })?;
            Ok(None)
        })
        .method("touch", |ctx| {
            let cmd = ctx.message::<Touch>()?;
            ctx.notify(Touched { id: cmd.id.clone() })?;
            if cmd.fail {
                return Err(BusError::Rejected(format!("cannot touch {}", cmd.id)));
            }
            Ok(None)
        })
        .method("reserve", move |_| {
            reserve.hit();
            Err(BusError::Retryable("stock service busy".into()))
        })
        .method("recount", move |_| {
            recount.hit();
            Err(BusError::SerializationFailure("could not serialize access".into()))
        })
}

// ============================================================================
// Listeners
// ============================================================================

pub fn listener_table() -> DispatchTable {
    let catalog = catalog();
    let descriptor = HandlerDescriptor::new("shop.AuditListener")
        .method(
            MethodDescriptor::new("onOrderEvent")
                .param(ParameterDescriptor::named("event", ORDER_EVENT))
                .attribute(HandlerAttribute::listener()),
        )
        .method(
            MethodDescriptor::new("onOrderChanged")
                .param(ParameterDescriptor::named("event", ORDER_CHANGED))
                .attribute(HandlerAttribute::listener()),
        );

    let mut table = DispatchTable::events();
    table
        .append_from(&HandlerResolver::listeners(&catalog), &descriptor, "audit")
        .unwrap();
    table
}

/// Listener log entries, formatted as `method:event type`.
pub type AuditLog = Arc<Mutex<Vec<String>>>;

pub fn audit_listener(log: AuditLog) -> MethodTable {
    let on_event = Arc::clone(&log);
    MethodTable::new()
        .method("onOrderEvent", move |ctx| {
            on_event
                .lock()
                .unwrap()
                .push(format!("onOrderEvent:{}", ctx.message_ref().message_type()));
            Ok(None)
        })
        .method("onOrderChanged", move |ctx| {
            log.lock()
                .unwrap()
                .push(format!("onOrderChanged:{}", ctx.message_ref().message_type()));
            Ok(None)
        })
}

pub fn listener_bus(log: AuditLog) -> ListenerEventBus {
    let container = HandlerContainer::new().with("audit", audit_listener(log));
    ListenerEventBus::new(EventListenerLocator::new(listener_table(), container))
}

// ============================================================================
// Wiring
// ============================================================================

/// Transactional consumer over the order handler, with recording doubles.
pub struct Harness {
    pub consumer: Arc<TransactionalCommandConsumer>,
    pub transactions: InMemoryTransactionManager,
    pub internal: RecordingEventBus,
    pub external: RecordingEventBus,
    pub calls: Calls,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(None, InMemoryTransactionManager::new())
    }

    /// Record internal events and forward them to `inner`.
    pub fn with_internal(inner: Arc<dyn EventBus>) -> Self {
        Self::with(Some(inner), InMemoryTransactionManager::new())
    }

    pub fn with(inner: Option<Arc<dyn EventBus>>, transactions: InMemoryTransactionManager) -> Self {
        let calls = Calls::default();
        let container = HandlerContainer::new().with("orders", order_handler(calls.clone()));
        let locator = CommandHandlerLocator::new(command_table(), container);

        let internal = match inner {
            Some(inner) => RecordingEventBus::decorate(inner),
            None => RecordingEventBus::new(),
        };
        let external = RecordingEventBus::new();

        let consumer = TransactionalCommandConsumer::new(
            Arc::new(DefaultCommandConsumer::new(locator)),
            Arc::new(internal.clone()),
            Arc::new(external.clone()),
            Arc::new(transactions.clone()),
        );

        Self {
            consumer: Arc::new(consumer),
            transactions,
            internal,
            external,
            calls,
        }
    }
}
