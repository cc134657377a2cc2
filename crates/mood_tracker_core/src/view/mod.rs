//! Read-only projections recomputed from store snapshots.

pub mod stats;
