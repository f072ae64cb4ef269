use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Transaction, TransactionManager};
use crate::error::{BusError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    /// Rolled back, with the cause message if one was given.
    RolledBack(Option<String>),
}

#[derive(Debug, Default)]
struct State {
    running: bool,
    started: usize,
    outcomes: Vec<TransactionOutcome>,
    commit_failures: VecDeque<String>,
}

/// Recording transaction manager for tests.
///
/// Counts started transactions and keeps every outcome. Commits can be
/// scripted to fail with a serialization failure. Clones share the same
/// state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionManager {
    state: Arc<Mutex<State>>,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a serialization failure.
    pub fn fail_commits(&self, count: usize, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.lock();
        for _ in 0..count {
            state.commit_failures.push_back(reason.clone());
        }
    }

    pub fn started(&self) -> usize {
        self.lock().started
    }

    pub fn outcomes(&self) -> Vec<TransactionOutcome> {
        self.lock().outcomes.clone()
    }

    pub fn committed(&self) -> usize {
        self.count(|o| *o == TransactionOutcome::Committed)
    }

    pub fn rolled_back(&self) -> usize {
        self.count(|o| matches!(o, TransactionOutcome::RolledBack(_)))
    }

    fn count(&self, f: impl Fn(&TransactionOutcome) -> bool) -> usize {
        self.lock().outcomes.iter().filter(|o| f(o)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn start(&self) -> Result<Box<dyn Transaction>> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| BusError::Poisoned(e.to_string()))?;
        if state.running {
            return Err(BusError::TransactionAlreadyRunning);
        }
        state.running = true;
        state.started += 1;

        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }

    fn running(&self) -> bool {
        self.lock().running
    }
}

struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    open: bool,
}

impl InMemoryTransaction {
    fn finish(&mut self, outcome: TransactionOutcome) -> Result<()> {
        if !self.open {
            return Err(BusError::Transaction("transaction is not running".into()));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|e| BusError::Poisoned(e.to_string()))?;

        if outcome == TransactionOutcome::Committed {
            if let Some(reason) = state.commit_failures.pop_front() {
                // Still running: the caller is expected to roll back.
                return Err(BusError::SerializationFailure(reason));
            }
        }

        self.open = false;
        state.running = false;
        state.outcomes.push(outcome);
        Ok(())
    }
}

impl Transaction for InMemoryTransaction {
    fn commit(&mut self) -> Result<()> {
        self.finish(TransactionOutcome::Committed)
    }

    fn rollback(&mut self, cause: Option<&BusError>) -> Result<()> {
        self.finish(TransactionOutcome::RolledBack(cause.map(|e| e.to_string())))
    }

    fn running(&self) -> bool {
        self.open
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.open {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.running = false;
            state.outcomes.push(TransactionOutcome::RolledBack(None));
        }
    }
}
