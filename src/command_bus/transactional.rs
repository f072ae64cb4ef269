use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use super::{CommandConsumer, CommandResponse};
use crate::error::{BusError, Result};
use crate::event_bus::{EventBuffer, EventBus};
use crate::message::{Envelope, MessagePolicies, MessageRef, MultiCommand};
use crate::transaction::{Transaction, TransactionManager};

/// Runs a command, or every command of a [`MultiCommand`], inside one
/// transaction and holds back the events it raises until commit.
///
/// Events raised by handlers reach the internal bus immediately and are
/// buffered for the external bus. On commit the buffer is flushed to the
/// external bus; on failure the transaction is rolled back, the buffer
/// discarded and the error returned. Internal notifications are not
/// undone.
///
/// A single message whose policy sets `no_transaction` runs without a
/// transaction; its events are still buffered. Commands nested in a batch
/// always run in the batch transaction.
pub struct TransactionalCommandConsumer {
    decorated: Arc<dyn CommandConsumer>,
    internal: Arc<dyn EventBus>,
    external: Arc<dyn EventBus>,
    transactions: Arc<dyn TransactionManager>,
    policies: Arc<MessagePolicies>,
}

/// Per-invocation sink handed to the decorated consumer and, through the
/// internal bus, to its listeners.
struct BufferedEvents<'a> {
    internal: &'a dyn EventBus,
    buffer: Mutex<EventBuffer>,
}

impl EventBus for BufferedEvents<'_> {
    fn notify(&self, event: MessageRef) -> Result<()> {
        debug!(event = event.message_type(), "Buffering event");
        self.internal.notify_with(event.clone(), self)?;
        self.buffer
            .lock()
            .map_err(|e| BusError::Poisoned(e.to_string()))?
            .add(event)
    }
}

impl TransactionalCommandConsumer {
    pub fn new(
        decorated: Arc<dyn CommandConsumer>,
        internal: Arc<dyn EventBus>,
        external: Arc<dyn EventBus>,
        transactions: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            decorated,
            internal,
            external,
            transactions,
            policies: Arc::new(MessagePolicies::new()),
        }
    }

    pub fn with_policies(mut self, policies: Arc<MessagePolicies>) -> Self {
        self.policies = policies;
        self
    }

    fn run(
        &self,
        envelope: Envelope,
        sink: &BufferedEvents<'_>,
        transaction: &mut Option<Box<dyn Transaction>>,
        index: &mut usize,
    ) -> Result<CommandResponse> {
        let batch = envelope.message().downcast_ref::<MultiCommand>().cloned();

        let Some(batch) = batch else {
            *index = 1;
            if self.policies.policy_for(&**envelope.message())?.no_transaction {
                info!(command = envelope.message_type(), "Running command without transaction");
                return self.consume_one(envelope, sink);
            }

            let tx = transaction.insert(self.transactions.start()?);
            let response = self.consume_one(envelope, sink)?;
            tx.commit()?;
            return Ok(response);
        };

        info!(commands = batch.len(), "Running multi-command transaction");
        let tx = transaction.insert(self.transactions.start()?);
        let mut response = CommandResponse::completed();
        for child in batch.iter() {
            *index += 1;
            response = self.consume_one(Envelope::new(Arc::clone(child), envelope.properties().clone()), sink)?;
        }
        tx.commit()?;
        Ok(response)
    }

    fn consume_one(&self, envelope: Envelope, sink: &BufferedEvents<'_>) -> Result<CommandResponse> {
        let message = Arc::clone(envelope.message());
        let response = self.decorated.consume(envelope, sink)?;

        if self.policies.policy_for(&*message)?.command_as_event {
            sink.notify(message)?;
        }
        Ok(response)
    }

    /// Events are already committed, so a poisoned buffer is still flushed.
    fn flush(&self, sink: &BufferedEvents<'_>) -> Result<()> {
        let events = sink.buffer.lock().unwrap_or_else(PoisonError::into_inner).flush()?;

        let total = events.len();
        let mut errors = 0;
        for event in events {
            let event_type = event.message_type();
            if let Err(e) = self.external.notify(event) {
                errors += 1;
                error!(event = event_type, error = %e, "Error while flushing event");
            }
        }

        debug!(total, errors, "Flushed {} events, {} errors", total, errors);
        Ok(())
    }

    fn discard(&self, sink: &BufferedEvents<'_>) {
        let mut buffer = sink.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let count = buffer.len();
        buffer.discard();
        if count > 0 {
            error!(count, "Discarded {} events", count);
        }
    }
}

impl CommandConsumer for TransactionalCommandConsumer {
    /// The caller's event sink is not used: handler events go through the
    /// internal bus and the buffer, then the external bus.
    fn consume(&self, envelope: Envelope, _events: &dyn EventBus) -> Result<CommandResponse> {
        let sink = BufferedEvents {
            internal: &*self.internal,
            buffer: Mutex::new(EventBuffer::new()),
        };
        let total = envelope
            .message()
            .downcast_ref::<MultiCommand>()
            .map_or(1, MultiCommand::len);

        let mut transaction: Option<Box<dyn Transaction>> = None;
        let mut index = 0;

        match self.run(envelope, &sink, &mut transaction, &mut index) {
            Ok(response) => {
                if let Err(err) = self.flush(&sink) {
                    error!(error = %err, "Failed to flush events after commit");
                    return Err(err);
                }
                Ok(response)
            }
            Err(err) => {
                error!(index, total, error = %err, "Transaction failed at item {}/{}", index, total);

                if let Some(mut tx) = transaction.filter(|tx| tx.running()) {
                    if let Err(e) = tx.rollback(Some(&err)) {
                        error!(error = %e, "Rollback failed");
                    }
                }
                self.discard(&sink);

                Err(err)
            }
        }
    }
}
