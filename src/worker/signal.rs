use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

/// Out-of-band instructions for a running worker, typically read from a
/// shared store so an operator can stop every worker at once.
pub trait RemoteSignalReader: Send + Sync {
    fn should_stop(&self, started_at: SystemTime) -> bool;

    /// The worker stops and reports that a restart was asked for.
    fn should_restart(&self, _started_at: SystemTime) -> bool {
        false
    }
}

/// Signals posted in process. A signal only applies to workers started
/// before it was posted.
#[derive(Debug, Clone, Default)]
pub struct InMemorySignalReader {
    state: Arc<Mutex<Signals>>,
}

#[derive(Debug, Default)]
struct Signals {
    stop_at: Option<SystemTime>,
    restart_at: Option<SystemTime>,
}

impl InMemorySignalReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_stop(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).stop_at = Some(SystemTime::now());
    }

    pub fn send_restart(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).restart_at = Some(SystemTime::now());
    }

    pub fn clear(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Signals::default();
    }
}

impl RemoteSignalReader for InMemorySignalReader {
    fn should_stop(&self, started_at: SystemTime) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stop_at.is_some_and(|at| at >= started_at)
    }

    fn should_restart(&self, started_at: SystemTime) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.restart_at.is_some_and(|at| at >= started_at)
    }
}
