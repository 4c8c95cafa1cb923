//! # Change Notification Fan-out
//!
//! Each entity store owns an [`ObserverRegistry`]. Screens subscribe while
//! they are visible and drop the returned [`Subscription`] when they stop.
//!
//! Every mutation that changes the scoped result set produces one batch:
//!
//! ```text
//! WillChange, Delete*, Insert*, Move*, Update*, DidChange
//! ```
//!
//! Batches are delivered synchronously on the task that performed the
//! mutation, to each observer in registration order. An observer added
//! during a delivery starts receiving from the next batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::trace;

/// One row-level change in a store's scoped result set.
///
/// Delete and update indices refer to the result set before the mutation,
/// insert indices to the result set after it.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange<E> {
    WillChange,
    Insert { index: usize, value: E },
    Delete { index: usize },
    Update { index: usize, value: E },
    Move { from: usize, to: usize, value: E },
    DidChange,
}

/// Receiver of store change batches.
pub trait StoreObserver<E>: Send + Sync {
    fn on_change(&self, change: &StoreChange<E>);
}

impl<E, F> StoreObserver<E> for F
where
    F: Fn(&StoreChange<E>) + Send + Sync,
{
    fn on_change(&self, change: &StoreChange<E>) {
        self(change)
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

struct RegistryInner<E> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Arc<dyn StoreObserver<E>>)>>,
}

impl<E> RegistryInner<E> {
    fn observers(&self) -> MutexGuard<'_, Vec<(u64, Arc<dyn StoreObserver<E>>)>> {
        // Observers never run under this lock, so poisoning cannot leave
        // the list half-updated.
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<E: 'static> Unregister for RegistryInner<E> {
    fn unregister(&self, id: u64) {
        self.observers().retain(|(observer_id, _)| *observer_id != id);
    }
}

/// Observer list of one store.
pub struct ObserverRegistry<E> {
    inner: Arc<RegistryInner<E>>,
}

impl<E: 'static> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register an observer. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: StoreObserver<E> + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers().push((id, Arc::new(observer)));
        trace!(id, "Observer registered");

        let inner: Arc<dyn Unregister> = self.inner.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.observers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a batch to every observer registered when delivery starts.
    pub fn notify(&self, batch: &[StoreChange<E>]) {
        if batch.is_empty() {
            return;
        }
        let snapshot: Vec<Arc<dyn StoreObserver<E>>> = self
            .inner
            .observers()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in snapshot {
            for change in batch {
                observer.on_change(change);
            }
        }
    }
}

impl<E: 'static> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle. Dropping it unregisters the observer.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unregister>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
            trace!(id = self.id, "Observer unregistered");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(name: &'static str, log: Log) -> impl Fn(&StoreChange<u32>) + Send + Sync {
        move |change| {
            let label = match change {
                StoreChange::WillChange => "will".to_string(),
                StoreChange::Insert { index, .. } => format!("insert {}", index),
                StoreChange::DidChange => "did".to_string(),
                other => format!("{:?}", other),
            };
            log.lock().unwrap().push(format!("{}:{}", name, label));
        }
    }

    fn batch() -> Vec<StoreChange<u32>> {
        vec![
            StoreChange::WillChange,
            StoreChange::Insert { index: 0, value: 7 },
            StoreChange::DidChange,
        ]
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let registry = ObserverRegistry::<u32>::new();
        let log: Log = Arc::default();
        let _a = registry.subscribe(recorder("a", log.clone()));
        let _b = registry.subscribe(recorder("b", log.clone()));

        registry.notify(&batch());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:will", "a:insert 0", "a:did", "b:will", "b:insert 0", "b:did"
            ]
        );
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = ObserverRegistry::<u32>::new();
        let log: Log = Arc::default();
        let a = registry.subscribe(recorder("a", log.clone()));
        let b = registry.subscribe(recorder("b", log.clone()));
        assert_eq!(registry.len(), 2);

        drop(a);
        b.unsubscribe();
        assert!(registry.is_empty());

        registry.notify(&batch());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry = ObserverRegistry::<u32>::new();
        let sub = registry.subscribe(|_: &StoreChange<u32>| {});
        drop(registry);
        drop(sub);
    }

    #[test]
    fn test_empty_batch_is_not_delivered() {
        let registry = ObserverRegistry::<u32>::new();
        let log: Log = Arc::default();
        let _a = registry.subscribe(recorder("a", log.clone()));
        registry.notify(&[]);
        assert!(log.lock().unwrap().is_empty());
    }
}
