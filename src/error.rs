use std::error::Error;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised while building the dispatch table or moving a message
/// through the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Registry or wiring problem detected at build time. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A transaction was started while another one is still running.
    #[error("a transaction is already running")]
    TransactionAlreadyRunning,

    /// The underlying store aborted the transaction because of an
    /// isolation conflict (serialization failure, deadlock).
    #[error("transaction serialization failure: {0}")]
    SerializationFailure(String),

    /// Any other transaction failure (commit or rollback refused).
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// No command handler is registered for the message runtime type.
    #[error("no handler found for command {0}")]
    HandlerNotFound(String),

    /// An event was added to a buffer after it was flushed or discarded.
    #[error("event buffer has already been flushed or discarded")]
    BufferClosed,

    /// Handler failure explicitly marked as safe to retry.
    #[error("retryable failure: {0}")]
    Retryable(String),

    /// Business logic rejected the message (validation, invariant).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The authorization checker refused the command.
    #[error("command is not authorized: {0}")]
    Unauthorized(String),

    /// A message builder was dispatched twice.
    #[error("command was already sent")]
    AlreadySent,

    /// Broker level failure (fetch, ack, reject, publish).
    #[error("queue error: {0}")]
    Queue(String),

    /// A lock guarding shared state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// Arbitrary handler error.
    #[error("handler error: {0}")]
    Handler(#[source] Box<dyn Error + Send + Sync>),
}

impl BusError {
    /// Wrap an arbitrary error raised by a handler.
    pub fn handler<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        BusError::Handler(Box::new(err))
    }

    /// Transaction isolation kind of failure.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, BusError::SerializationFailure(_))
    }

    /// Failure generically marked as retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Retryable(_))
    }
}
