//! Mood entry store.
//!
//! Entries are append-mostly; timestamps are stamped on insert and need not
//! be monotonic.

use super::persisted::{PersistedStore, Subscription};
use crate::model::mood::{MoodAggregate, MoodEntry, MoodEntryPatch, NewMoodEntry};
use crate::storage::KeyValueStore;
use log::{debug, info};
use std::sync::Arc;

pub const MOOD_STORE_KEY: &str = "mood-tracker";

pub struct MoodStore {
    inner: PersistedStore<MoodAggregate>,
}

impl MoodStore {
    /// Loads the store under the default `mood-tracker` key.
    pub fn new(backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self::with_key(MOOD_STORE_KEY, backing)
    }

    pub fn with_key(key: impl Into<String>, backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self {
            inner: PersistedStore::load(key, backing),
        }
    }

    pub fn subscribe(&self) -> Subscription<MoodAggregate> {
        self.inner.subscribe()
    }

    pub fn snapshot(&self) -> Arc<MoodAggregate> {
        self.inner.snapshot()
    }

    pub fn persisted_text(&self) -> Option<String> {
        self.inner.persisted_text()
    }

    pub fn add_entry(&self, new_entry: NewMoodEntry) -> MoodEntry {
        let entry = new_entry.into_entry();
        debug!(
            "event=mood_add module=store status=ok entry_id={} user_id={}",
            entry.id, entry.user_id
        );
        self.inner.update(|state| {
            state.entries.push(entry.clone());
            entry
        })
    }

    /// Merges `patch` into the entry with `entry_id`; returns whether it existed.
    pub fn update_entry(&self, entry_id: &str, patch: MoodEntryPatch) -> bool {
        self.inner.update(|state| {
            match state.entries.iter_mut().find(|e| e.id == entry_id) {
                Some(entry) => {
                    patch.apply(entry);
                    true
                }
                None => false,
            }
        })
    }

    pub fn delete_entry(&self, entry_id: &str) {
        self.inner.update(|state| state.entries.retain(|e| e.id != entry_id));
    }

    /// Removes every entry recorded for `company_id`; returns how many went.
    pub fn delete_entries_for_company(&self, company_id: &str) -> usize {
        self.inner.update(|state| {
            let before = state.entries.len();
            state.entries.retain(|e| e.company_id != company_id);
            before - state.entries.len()
        })
    }

    pub fn entries_for_user(&self, user_id: &str) -> Vec<MoodEntry> {
        self.snapshot()
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        info!("event=mood_store_clear module=store status=ok");
        self.inner.set(MoodAggregate::default());
    }
}
