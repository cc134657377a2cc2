//! Typed values wrapped with a write timestamp.
//!
//! Every helper is best-effort: failures are logged and reported as absence,
//! never propagated to the caller.

use super::{KeyValueStore, StorageError};
use crate::model::now_epoch_ms;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Stored envelope: `{ "value": T, "timestamp": <epoch ms> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem<T> {
    pub value: T,
    pub timestamp: i64,
}

/// Writes `value` under `key` stamped with the current time.
pub fn set_item<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let item = StorageItem {
        value,
        timestamp: now_epoch_ms(),
    };
    let result = serde_json::to_string(&item)
        .map_err(StorageError::from)
        .and_then(|text| store.set(key, &text));
    if let Err(err) = result {
        error!("event=storage_item_set module=storage status=error key={key} error={err}");
    }
}

/// Reads the inner value under `key`; `None` when absent or malformed.
pub fn get_item<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    read_item::<T>(store, key).map(|item| item.value)
}

/// Write time of the value under `key`, if present and well formed.
pub fn item_timestamp(store: &dyn KeyValueStore, key: &str) -> Option<i64> {
    read_item::<serde_json::Value>(store, key).map(|item| item.timestamp)
}

pub fn has_item(store: &dyn KeyValueStore, key: &str) -> bool {
    store.contains(key).unwrap_or(false)
}

pub fn remove_item(store: &dyn KeyValueStore, key: &str) {
    if let Err(err) = store.remove(key) {
        error!("event=storage_item_remove module=storage status=error key={key} error={err}");
    }
}

pub fn clear_items(store: &dyn KeyValueStore) {
    if let Err(err) = store.clear() {
        error!("event=storage_clear module=storage status=error error={err}");
    }
}

fn read_item<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<StorageItem<T>> {
    let text = match store.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            error!("event=storage_item_get module=storage status=error key={key} error={err}");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(item) => Some(item),
        Err(err) => {
            warn!("event=storage_item_get module=storage status=malformed key={key} error={err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{get_item, has_item, item_timestamp, remove_item, set_item};
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};

    #[test]
    fn typed_item_roundtrip_carries_timestamp() {
        let store = MemoryKeyValueStore::new();
        set_item(&store, "prefs", &vec!["dark".to_string()]);

        assert!(has_item(&store, "prefs"));
        assert_eq!(
            get_item::<Vec<String>>(&store, "prefs"),
            Some(vec!["dark".to_string()])
        );
        assert!(item_timestamp(&store, "prefs").unwrap() > 0);

        remove_item(&store, "prefs");
        assert!(!has_item(&store, "prefs"));
    }

    #[test]
    fn malformed_item_reads_as_absent() {
        let store = MemoryKeyValueStore::new();
        store.set("broken", "{not json").unwrap();

        assert_eq!(get_item::<u32>(&store, "broken"), None);
        assert_eq!(item_timestamp(&store, "broken"), None);
    }

    #[test]
    fn raw_value_without_envelope_reads_as_absent() {
        let store = MemoryKeyValueStore::new();
        store.set("raw", "42").unwrap();

        assert_eq!(get_item::<u32>(&store, "raw"), None);
    }
}
