//! Transaction contracts.
//!
//! The transactional resource (usually a database connection) lives
//! outside the bus. Backends implement [`TransactionManager`], which hands
//! out one running [`Transaction`] at a time.

mod in_memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BusError, Result};

pub use in_memory::{InMemoryTransactionManager, TransactionOutcome};

/// A running transaction.
pub trait Transaction: Send {
    fn commit(&mut self) -> Result<()>;

    /// Roll back. `cause` is the error that aborted the unit of work.
    fn rollback(&mut self, cause: Option<&BusError>) -> Result<()>;

    fn running(&self) -> bool;
}

pub trait TransactionManager: Send + Sync {
    /// Start a transaction.
    ///
    /// Fails with [`BusError::TransactionAlreadyRunning`] while the previous
    /// one is neither committed nor rolled back.
    fn start(&self) -> Result<Box<dyn Transaction>>;

    fn running(&self) -> bool;
}

impl<T: TransactionManager + ?Sized> TransactionManager for Arc<T> {
    fn start(&self) -> Result<Box<dyn Transaction>> {
        (**self).start()
    }

    fn running(&self) -> bool {
        (**self).running()
    }
}

/// Transaction manager with no resource behind it.
///
/// Still enforces one running transaction at a time.
#[derive(Debug, Default)]
pub struct NullTransactionManager {
    running: Arc<AtomicBool>,
}

impl NullTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionManager for NullTransactionManager {
    fn start(&self) -> Result<Box<dyn Transaction>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BusError::TransactionAlreadyRunning);
        }
        Ok(Box::new(NullTransaction {
            running: Arc::clone(&self.running),
            open: true,
        }))
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

struct NullTransaction {
    running: Arc<AtomicBool>,
    open: bool,
}

impl NullTransaction {
    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(BusError::Transaction("transaction is not running".into()));
        }
        self.open = false;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Transaction for NullTransaction {
    fn commit(&mut self) -> Result<()> {
        self.close()
    }

    fn rollback(&mut self, _cause: Option<&BusError>) -> Result<()> {
        self.close()
    }

    fn running(&self) -> bool {
        self.open
    }
}

impl Drop for NullTransaction {
    fn drop(&mut self) {
        // Dropped while open counts as rolled back.
        if self.open {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}
