//! Load-state tracking with explicit observers.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of a user-triggered load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Ready,
    Loading,
    Success,
    Error,
}

/// Token returned by [`LoadTracker::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(LoadState, LoadState) + Send + Sync>;

#[derive(Default)]
struct Inner {
    state: LoadState,
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

/// Current [`LoadState`] plus the observers notified on every change.
///
/// Observers run synchronously, in registration order, with `(new, old)`.
/// They are called without the internal lock held, so they may read the
/// tracker or subscribe further observers.
#[derive(Default)]
pub struct LoadTracker {
    inner: Mutex<Inner>,
}

impl LoadTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> LoadState {
        self.lock().state
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(LoadState, LoadState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        inner.observers.len() != before
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Set the state and notify observers.
    pub fn set(&self, state: LoadState) {
        self.transition(|_| Some(state));
    }

    /// Enter [`LoadState::Loading`] unless a load is already running.
    pub fn begin(&self) -> bool {
        self.transition(|current| (current != LoadState::Loading).then_some(LoadState::Loading))
    }

    /// Apply `next` to the current state under the lock, then notify
    /// observers outside it. Returns `false` if `next` declined.
    fn transition(&self, next: impl FnOnce(LoadState) -> Option<LoadState>) -> bool {
        let (new, old, observers) = {
            let mut inner = self.lock();
            let Some(new) = next(inner.state) else {
                return false;
            };
            let old = std::mem::replace(&mut inner.state, new);
            let observers: Vec<Observer> =
                inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect();
            (new, old, observers)
        };
        for observer in observers {
            observer(new, old);
        }
        true
    }

    /// Run `load` as the current load. Returns `None` without polling
    /// `load` if another load is in progress. Whatever the outcome, the
    /// state leaves [`LoadState::Loading`]; a load dropped before it
    /// completes ends in [`LoadState::Error`].
    pub async fn track<T, E>(
        &self,
        load: impl Future<Output = Result<T, E>>,
    ) -> Option<Result<T, E>> {
        if !self.begin() {
            return None;
        }
        let mut abandoned = Abandoned(Some(self));
        let result = load.await;
        abandoned.0 = None;
        self.set(if result.is_ok() {
            LoadState::Success
        } else {
            LoadState::Error
        });
        Some(result)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fails the current load when dropped while still armed.
struct Abandoned<'a>(Option<&'a LoadTracker>);

impl Drop for Abandoned<'_> {
    fn drop(&mut self) {
        if let Some(tracker) = self.0.take() {
            tracing::debug!("Tracked load dropped before completion");
            tracker.set(LoadState::Error);
        }
    }
}
