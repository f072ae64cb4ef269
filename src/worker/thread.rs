//! Run a [`Worker`] on a background thread.

use std::thread::{self, JoinHandle};

use super::{Worker, WorkerControl, WorkerStats};

/// A worker running on its own thread.
///
/// ## Example
///
/// ```ignore
/// use std::sync::Arc;
/// use corebus::queue::InMemoryQueue;
/// use corebus::worker::{Worker, WorkerThread};
///
/// let queue = InMemoryQueue::new();
/// let worker = Worker::new(consumer, Arc::new(queue.clone()));
///
/// let handle = WorkerThread::spawn(worker);
/// // ... publish commands to the queue ...
/// let stats = handle.stop();
/// println!("Handled {} messages", stats.messages_handled);
/// ```
pub struct WorkerThread {
    control: WorkerControl,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl WorkerThread {
    pub fn spawn(mut worker: Worker) -> Self {
        let control = worker.control();
        let handle = thread::spawn(move || worker.run());

        Self {
            control,
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait for it. The message in flight,
    /// if any, is finished first.
    pub fn stop(self) -> WorkerStats {
        self.control.stop();
        self.join()
    }

    /// Wait for the worker to stop on its own (limit, remote signal).
    pub fn join(mut self) -> WorkerStats {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }

    /// Signal the worker to stop without waiting.
    pub fn signal_stop(&self) {
        self.control.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.control.stop();
    }
}
