use tracing::debug;

use super::EventBus;
use crate::error::Result;
use crate::handler::EventListenerLocator;
use crate::message::MessageRef;

/// Synchronous bus running every matching listener in the caller's stack.
///
/// Listeners raising events of their own notify the sink given to
/// [`EventBus::notify_with`], or this same bus for a plain `notify`. The
/// first failing listener stops the fan-out and its error is returned.
pub struct ListenerEventBus {
    locator: EventListenerLocator,
}

impl ListenerEventBus {
    pub fn new(locator: EventListenerLocator) -> Self {
        Self { locator }
    }
}

impl EventBus for ListenerEventBus {
    fn notify(&self, event: MessageRef) -> Result<()> {
        self.notify_with(event, self)
    }

    fn notify_with(&self, event: MessageRef, sink: &dyn EventBus) -> Result<()> {
        let listeners = self.locator.find(&event)?;
        debug!(event = event.message_type(), listeners = listeners.len(), "Notifying listeners");

        for listener in &listeners {
            listener.call(&event, sink)?;
        }
        Ok(())
    }
}
