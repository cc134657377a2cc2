//! Generic persisted reactive aggregate.
//!
//! # Responsibility
//! - Load an aggregate from its storage key, or start from the empty value.
//! - Apply mutations as one read-modify-persist-publish step.
//! - Fan every published snapshot out to subscribers in mutation order.
//!
//! # Invariants
//! - The store mutex is held across the whole step, so no subscriber or
//!   reader observes a partially applied mutation.
//! - After every mutation the persisted text is the serialization of the
//!   published snapshot, unless the backing write failed (logged, not retried).
//! - Load failures of any kind yield `A::default()`.

use crate::storage::KeyValueStore;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Anything that can live behind a [`PersistedStore`].
///
/// `Default` must be the explicit empty aggregate.
pub trait Aggregate: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {}

impl<T> Aggregate for T where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
}

struct Inner<A> {
    snapshot: Arc<A>,
    subscribers: Vec<Sender<Arc<A>>>,
}

/// Aggregate value kept in memory and mirrored under one storage key.
pub struct PersistedStore<A: Aggregate> {
    key: String,
    backing: Option<Arc<dyn KeyValueStore>>,
    inner: Mutex<Inner<A>>,
}

impl<A: Aggregate> PersistedStore<A> {
    /// Loads the aggregate stored under `key`.
    ///
    /// `backing = None` models an execution context with no durable store:
    /// the store starts empty and mutations stay in memory.
    pub fn load(key: impl Into<String>, backing: Option<Arc<dyn KeyValueStore>>) -> Self {
        let key = key.into();
        let initial = match &backing {
            Some(store) => load_or_default::<A>(store.as_ref(), &key),
            None => {
                info!("event=store_load module=store status=unavailable key={key}");
                A::default()
            }
        };

        Self {
            key,
            backing,
            inner: Mutex::new(Inner {
                snapshot: Arc::new(initial),
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current published snapshot.
    pub fn snapshot(&self) -> Arc<A> {
        Arc::clone(&self.lock().snapshot)
    }

    /// Registers a subscriber that starts at the current snapshot.
    pub fn subscribe(&self) -> Subscription<A> {
        let (sender, receiver) = mpsc::channel();
        let mut inner = self.lock();
        inner.subscribers.push(sender);
        Subscription {
            current: Arc::clone(&inner.snapshot),
            receiver,
        }
    }

    /// Applies an infallible mutation and returns its output.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut A) -> T) -> T {
        match self.try_update(|draft| Ok::<T, std::convert::Infallible>(mutate(draft))) {
            Ok(output) => output,
            Err(never) => match never {},
        }
    }

    /// Applies a mutation that may reject.
    ///
    /// On `Err` nothing is published or persisted.
    pub fn try_update<T, E>(&self, mutate: impl FnOnce(&mut A) -> Result<T, E>) -> Result<T, E> {
        let mut inner = self.lock();
        let mut draft = A::clone(&inner.snapshot);
        let output = mutate(&mut draft)?;
        self.commit(&mut inner, draft);
        Ok(output)
    }

    /// Replaces the whole aggregate.
    pub fn set(&self, value: A) {
        let mut inner = self.lock();
        self.commit(&mut inner, value);
    }

    /// Text currently stored under the key, if a backing store is attached.
    pub fn persisted_text(&self) -> Option<String> {
        let store = self.backing.as_ref()?;
        match store.get(&self.key) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=store_read_back module=store status=error key={} error={}",
                    self.key, err
                );
                None
            }
        }
    }

    fn commit(&self, inner: &mut Inner<A>, value: A) {
        let snapshot = Arc::new(value);
        inner.snapshot = Arc::clone(&snapshot);
        self.persist(&snapshot);
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
    }

    fn persist(&self, snapshot: &A) {
        let Some(store) = &self.backing else {
            debug!(
                "event=store_persist module=store status=skipped key={} reason=no_backing_store",
                self.key
            );
            return;
        };

        let result = serde_json::to_string(snapshot)
            .map_err(|err| err.to_string())
            .and_then(|text| store.set(&self.key, &text).map_err(|err| err.to_string()));
        match result {
            Ok(()) => debug!("event=store_persist module=store status=ok key={}", self.key),
            Err(err) => error!(
                "event=store_persist module=store status=error key={} error={}",
                self.key, err
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_or_default<A: Aggregate>(store: &dyn KeyValueStore, key: &str) -> A {
    match store.get(key) {
        Ok(Some(text)) => match serde_json::from_str(&text) {
            Ok(value) => {
                info!("event=store_load module=store status=ok key={key}");
                value
            }
            Err(err) => {
                warn!("event=store_load module=store status=malformed key={key} error={err}");
                A::default()
            }
        },
        Ok(None) => {
            info!("event=store_load module=store status=empty key={key}");
            A::default()
        }
        Err(err) => {
            error!("event=store_load module=store status=error key={key} error={err}");
            A::default()
        }
    }
}

/// Ordered stream of snapshots published by one [`PersistedStore`].
pub struct Subscription<A> {
    current: Arc<A>,
    receiver: Receiver<Arc<A>>,
}

impl<A> Subscription<A> {
    /// Latest snapshot this subscriber has consumed.
    pub fn current(&self) -> &Arc<A> {
        &self.current
    }

    /// Takes the next published snapshot without blocking.
    pub fn try_next(&mut self) -> Option<Arc<A>> {
        let next = self.receiver.try_recv().ok()?;
        self.current = Arc::clone(&next);
        Some(next)
    }

    /// Waits up to `timeout` for the next published snapshot.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Arc<A>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(next) => {
                self.current = Arc::clone(&next);
                Some(next)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Consumes everything pending and returns the newest snapshot.
    pub fn latest(&mut self) -> &Arc<A> {
        while self.try_next().is_some() {}
        &self.current
    }
}
