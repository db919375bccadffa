use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashlink::LruCache;

use crate::value::PgValueFormat;

/// Memo key: plans depend on nothing else.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PlanKey {
    pub(crate) oid: u32,
    pub(crate) host_type: TypeId,
    pub(crate) format: PgValueFormat,
}

/// An LRU cache of resolved plans.
///
/// Lookups and inserts take a short lock and never hold it while a plan is being resolved, so
/// two threads missing on the same key may both resolve it; the second insert wins. Everything
/// is dropped when the owning registry changes.
pub(crate) struct PlanCache<P: ?Sized> {
    inner: Mutex<LruCache<PlanKey, Arc<P>>>,
    capacity: usize,
}

impl<P: ?Sized> PlanCache<P> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PlanKey, Arc<P>>> {
        // entries are immutable plans; a poisoned lock holds no partial state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, key: &PlanKey) -> Option<Arc<P>> {
        if !self.is_enabled() {
            return None;
        }

        self.lock().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: PlanKey, plan: Arc<P>) {
        if self.is_enabled() {
            self.lock().insert(key, plan);
        }
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.capacity > 0
    }
}

impl<P: ?Sized> fmt::Debug for PlanCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
