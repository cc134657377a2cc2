//! Entity shapes persisted by the aggregate stores.
//!
//! # Responsibility
//! - Define the company/user/task tree and the mood entry log.
//! - Keep the wire shape compatible with the camelCase records already
//!   sitting in on-device storage.
//!
//! # Invariants
//! - Every entity id is an opaque string generated once at creation.
//! - Timestamps are Unix epoch milliseconds stamped by the store.

pub mod company;
pub mod mood;
pub mod stat;

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque entity identifier.
pub type EntityId = String;

/// Generates a fresh random identifier.
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
