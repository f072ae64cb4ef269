//! Queue worker - pulls messages from a broker and feeds a consumer.
//!
//! ```text
//!            ┌──────── idle (sleep) ◄── none ──┐
//!            ▼                                 │
//!   start ─► poll ── get() ────────────────────┤
//!            ▲                                 │ envelope
//!            │                                 ▼
//!            │                         next ─► consume
//!            │                                 │
//!            ├──── done ◄── ack ◄──── ok ──────┤
//!            └──── error ◄─ reject ◄─ err ─────┘
//! ```
//!
//! One message is fully processed before the next poll. Stopping is
//! cooperative: [`WorkerControl::stop`] is honoured at the next loop
//! check, including right after an empty poll.

mod event;
mod signal;
mod thread;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info, warn};

use crate::command_bus::CommandConsumer;
use crate::config::WorkerConfig;
use crate::error::{BusError, Result};
use crate::event_bus::{EventBus, NullEventBus};
use crate::queue::MessageConsumer;
use crate::retry::{RetryStrategy, RetryStrategyCommandConsumerDecorator};

pub use event::{WorkerControl, WorkerEvent, WorkerEventKind};
pub use signal::{InMemorySignalReader, RemoteSignalReader};
pub use thread::WorkerThread;

pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1000);

type Listener = Arc<dyn Fn(&WorkerEvent<'_>, &WorkerControl) + Send + Sync>;

/// Counters returned by [`Worker::run`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Messages consumed without error.
    pub messages_handled: usize,
    /// Messages whose consumer returned an error.
    pub messages_failed: usize,
    /// Calls to the broker `get`.
    pub polls: usize,
    /// Empty polls.
    pub idles: usize,
    /// Broker `get` failures.
    pub poll_errors: usize,
    /// The remote signal reader asked for a restart.
    pub restart_requested: bool,
}

pub struct Worker {
    consumer: Arc<dyn CommandConsumer>,
    queue: Arc<dyn MessageConsumer>,
    events: Arc<dyn EventBus>,
    idle_sleep: Duration,
    limit: usize,
    retry_strategy_set: bool,
    signals: Option<Arc<dyn RemoteSignalReader>>,
    listeners: Vec<(WorkerEventKind, Listener)>,
    control: WorkerControl,
    started_at: Option<SystemTime>,
}

impl Worker {
    pub fn new(consumer: Arc<dyn CommandConsumer>, queue: Arc<dyn MessageConsumer>) -> Self {
        Self {
            consumer,
            queue,
            events: Arc::new(NullEventBus),
            idle_sleep: DEFAULT_IDLE_SLEEP,
            limit: 0,
            retry_strategy_set: false,
            signals: None,
            listeners: Vec::new(),
            control: WorkerControl::new(),
            started_at: None,
        }
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    /// Stop after `limit` messages, failed ones included. 0 means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_config(self, config: &WorkerConfig) -> Self {
        let limit = usize::try_from(config.limit).unwrap_or(usize::MAX);
        self.with_idle_sleep(Duration::from_millis(config.idle_sleep_ms))
            .with_limit(limit)
    }

    /// Event bus handed to the consumer for each message.
    pub fn with_event_bus(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Wrap the consumer in a [`RetryStrategyCommandConsumerDecorator`].
    ///
    /// Can be done once, before the worker runs.
    pub fn with_retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Result<Self> {
        if self.started_at.is_some() {
            return Err(BusError::Configuration(
                "retry strategy must be set before running the worker".into(),
            ));
        }
        if self.retry_strategy_set {
            return Err(BusError::Configuration(
                "retry strategy was already set and cannot be changed".into(),
            ));
        }

        self.consumer = Arc::new(RetryStrategyCommandConsumerDecorator::new(
            Arc::clone(&self.consumer),
            strategy,
            Arc::clone(&self.queue),
        ));
        self.retry_strategy_set = true;
        Ok(self)
    }

    pub fn with_signal_reader(mut self, signals: Arc<dyn RemoteSignalReader>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Register a lifecycle listener.
    pub fn on<F>(mut self, kind: WorkerEventKind, listener: F) -> Self
    where
        F: Fn(&WorkerEvent<'_>, &WorkerControl) + Send + Sync + 'static,
    {
        self.listeners.push((kind, Arc::new(listener)));
        self
    }

    pub fn control(&self) -> WorkerControl {
        self.control.clone()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Process messages until stopped. A worker runs only once; later
    /// calls return empty stats.
    pub fn run(&mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        if self.started_at.is_some() {
            warn!("Worker already ran");
            return stats;
        }

        let started_at = SystemTime::now();
        self.started_at = Some(started_at);
        info!(limit = self.limit, idle_ms = self.idle_sleep.as_millis() as u64, "Worker started");
        self.emit(&WorkerEvent::start());

        let mut processed = 0usize;
        while !self.control.is_stopped() {
            self.read_signals(started_at, &mut stats);
            if self.control.is_stopped() {
                break;
            }

            stats.polls += 1;
            let envelope = match self.queue.get() {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    stats.idles += 1;
                    if self.idle() {
                        break;
                    }
                    continue;
                }
                Err(err) => {
                    error!(error = %err, "Failed to fetch message");
                    stats.poll_errors += 1;
                    if self.idle() {
                        break;
                    }
                    continue;
                }
            };

            self.emit(&WorkerEvent::next(&envelope));
            debug!(message_type = envelope.message_type(), id = ?envelope.message_id(), "Processing message");

            match self.consumer.consume(envelope.clone(), &*self.events) {
                Ok(_) => {
                    if let Err(err) = self.queue.ack(&envelope) {
                        error!(error = %err, "Failed to acknowledge message");
                    }
                    stats.messages_handled += 1;
                    self.emit(&WorkerEvent::done(&envelope));
                }
                Err(err) => {
                    error!(message_type = envelope.message_type(), error = %err, "Error happened during processing message");
                    stats.messages_failed += 1;
                    self.emit(&WorkerEvent::failure(&envelope, &err));
                    if let Err(queue_err) = self.queue.reject(envelope, Some(&err)) {
                        error!(error = %queue_err, "Failed to reject message");
                    }
                }
            }

            processed += 1;
            if self.limit > 0 && processed >= self.limit {
                info!(processed, "Worker limit reached");
                self.control.stop();
            }
        }

        self.emit(&WorkerEvent::stop());
        info!(
            handled = stats.messages_handled,
            failed = stats.messages_failed,
            "Worker stopped"
        );
        stats
    }

    /// Handle an empty poll. Returns true when the loop must end instead
    /// of sleeping.
    fn idle(&self) -> bool {
        // A blocking get may have outlived a stop request.
        if self.control.is_stopped() {
            return true;
        }
        self.emit(&WorkerEvent::idle());
        if self.control.is_stopped() {
            return true;
        }
        std::thread::sleep(self.idle_sleep);
        false
    }

    fn read_signals(&self, started_at: SystemTime, stats: &mut WorkerStats) {
        let Some(signals) = &self.signals else {
            return;
        };
        if signals.should_restart(started_at) {
            info!("Restart requested by remote signal");
            stats.restart_requested = true;
            self.control.stop();
        } else if signals.should_stop(started_at) {
            info!("Stop requested by remote signal");
            self.control.stop();
        }
    }

    fn emit(&self, event: &WorkerEvent<'_>) {
        for (kind, listener) in &self.listeners {
            if *kind == event.kind() {
                listener(event, &self.control);
            }
        }
    }
}
