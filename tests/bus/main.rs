//! Command bus integration tests.
//!
//! - Handler registry resolution and supertype listener matching
//! - Transactional consumer: buffering, rollback, batches, opt-out
//! - Retry decorator decisions against an in-memory broker
//! - Worker loop lifecycle and resilience
//! - Full pipeline: queue bus, worker, retries, reply-to

mod support;
mod registry;
mod retry;
mod transactional;
mod worker;
