//! Recurring job store for Cadence.
//!
//! This crate provides:
//! - Composite job keys (schedule id + schedule group)
//! - Recurring job records and named job parameters
//! - The store/connection traits the scheduler reads through
//! - An in-memory store with JSON snapshot persistence

mod error;
mod key;
mod memory;
mod records;
mod store;

pub use error::{KeyError, StoreError};
pub use key::JobKey;
pub use memory::MemoryStore;
pub use records::{JobPayload, ORIGINAL_RECURRENCE_PARAM, RecurringJobRecord};
pub use store::{JobStore, StoreConnection};
