//! In-memory broker for tests and single-process setups.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{MessageConsumer, MessagePublisher};
use crate::error::{BusError, Result};
use crate::message::{property, Envelope};

/// Deferral used when `retry-delay` does not fit in an `Instant`.
const MAX_DEFERRAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct Pending {
    envelope: Envelope,
    not_before: Option<Instant>,
}

#[derive(Default)]
struct State {
    ready: VecDeque<Pending>,
    in_flight: HashMap<String, Envelope>,
    acked: Vec<Envelope>,
    requeued: Vec<Envelope>,
    dead: Vec<(Envelope, Option<String>)>,
}

/// In-memory queue implementing both broker sides.
///
/// - Publishing assigns a `message-id` when the envelope has none.
/// - `get` hands out the oldest ready message and tracks it as in flight.
/// - `reject` of an envelope carrying `retry-count` puts it back, not
///   deliverable before `retry-delay` milliseconds. Any other reject
///   dead-letters it.
/// - `ack` or `reject` of a message no longer in flight is a no-op.
///
/// Clones share the same queue.
///
/// ```
/// use corebus::queue::{InMemoryQueue, MessageConsumer, MessagePublisher};
/// use corebus::{Envelope, MultiCommand};
///
/// let queue = InMemoryQueue::new();
/// queue.publish(Envelope::of(MultiCommand::default())).unwrap();
///
/// let envelope = queue.get().unwrap().unwrap();
/// assert!(envelope.message_id().is_some());
/// queue.ack(&envelope).unwrap();
/// assert_eq!(queue.acknowledged().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<State>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting for delivery, delayed ones included.
    pub fn len(&self) -> usize {
        self.read().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().ready.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.read().in_flight.len()
    }

    pub fn acknowledged(&self) -> Vec<Envelope> {
        self.read().acked.clone()
    }

    /// Every envelope put back for a retry, in order.
    pub fn requeued(&self) -> Vec<Envelope> {
        self.read().requeued.clone()
    }

    pub fn dead_letters(&self) -> Vec<Envelope> {
        self.read().dead.iter().map(|(e, _)| e.clone()).collect()
    }

    /// Rejection causes of dead letters, in order.
    pub fn dead_letter_causes(&self) -> Vec<Option<String>> {
        self.read().dead.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Clear all messages and history.
    pub fn clear(&self) {
        *self.read() = State::default();
    }

    fn read(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| BusError::Poisoned(e.to_string()))
    }
}

impl MessagePublisher for InMemoryQueue {
    fn publish(&self, envelope: Envelope) -> Result<()> {
        let envelope = if envelope.message_id().is_some() {
            envelope
        } else {
            envelope.with_property(property::MESSAGE_ID, uuid::Uuid::new_v4().to_string())
        };

        self.write()?.ready.push_back(Pending {
            envelope,
            not_before: None,
        });
        Ok(())
    }
}

impl MessageConsumer for InMemoryQueue {
    fn get(&self) -> Result<Option<Envelope>> {
        let mut state = self.write()?;
        let now = Instant::now();

        let position = state
            .ready
            .iter()
            .position(|p| p.not_before.map_or(true, |at| at <= now));
        let Some(pending) = position.and_then(|i| state.ready.remove(i)) else {
            return Ok(None);
        };

        let envelope = pending.envelope;
        if let Some(id) = envelope.message_id() {
            state.in_flight.insert(id.to_string(), envelope.clone());
        }
        Ok(Some(envelope))
    }

    fn ack(&self, envelope: &Envelope) -> Result<()> {
        let mut state = self.write()?;
        let Some(id) = envelope.message_id() else {
            return Ok(());
        };

        if let Some(delivered) = state.in_flight.remove(id) {
            state.acked.push(delivered);
        }
        Ok(())
    }

    fn reject(&self, envelope: Envelope, cause: Option<&BusError>) -> Result<()> {
        let mut state = self.write()?;
        let id = match envelope.message_id() {
            Some(id) => id.to_string(),
            None => {
                warn!(message_type = envelope.message_type(), "Rejecting a message without id");
                state.dead.push((envelope, cause.map(|e| e.to_string())));
                return Ok(());
            }
        };

        if state.in_flight.remove(&id).is_none() {
            debug!(message_id = %id, "Message is not in flight, ignoring reject");
            return Ok(());
        }

        if envelope.retry_count().is_some() {
            let delay = envelope.retry_delay().unwrap_or(0);
            debug!(message_id = %id, delay_ms = delay, "Requeuing message");
            state.requeued.push(envelope.clone());
            state.ready.push_back(Pending {
                envelope,
                not_before: deferred_until(delay),
            });
        } else {
            debug!(message_id = %id, "Dead-lettering message");
            state.dead.push((envelope, cause.map(|e| e.to_string())));
        }
        Ok(())
    }
}

fn deferred_until(delay_ms: u64) -> Option<Instant> {
    let now = Instant::now();
    now.checked_add(Duration::from_millis(delay_ms)).or_else(|| {
        warn!(delay_ms, "Retry delay out of range, deferring by the maximum");
        now.checked_add(MAX_DEFERRAL)
    })
}
