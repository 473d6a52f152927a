//! Typed-key attribute storage for records.
//!
//! Hydrators attach derived data to records through [`AttributeMap`]. Keys
//! are declared once, globally (`static` + `Lazy`), and compare by identity:
//! two separately created keys are never equal, even with the same name.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

static NEXT_KEY_ID: AtomicU32 = AtomicU32::new(0);

/// A process-wide typed key for [`AttributeMap`].
pub struct AttributeKey<T> {
    id: u32,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn id(&self) -> u32 {
        self.id
    }
}

impl<T> PartialEq for AttributeKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeKey({}#{})", self.name, self.id)
    }
}

/// Concurrent map from [`AttributeKey`] to a value of the key's type.
///
/// `compute_if_absent` is the only write path hydrators should use when two
/// of them may race on the same record; the initializer runs under the map's
/// write lock, so at most one initializer executes per key.
#[derive(Default)]
pub struct AttributeMap {
    values: RwLock<HashMap<u32, Arc<dyn Any + Send + Sync>>>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> Option<Arc<T>> {
        let values = self.values.read();
        values
            .get(&key.id())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> bool {
        self.values.read().contains_key(&key.id())
    }

    pub fn store<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>, value: T) {
        self.values.write().insert(key.id(), Arc::new(value));
    }

    pub fn compute_if_absent<T, F>(&self, key: &AttributeKey<T>, init: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get(key) {
            return existing;
        }
        let mut values = self.values.write();
        match values.entry(key.id()) {
            Entry::Occupied(entry) => match entry.get().clone().downcast::<T>() {
                Ok(existing) => existing,
                // A typed key maps to exactly one value type; replace on the
                // impossible mismatch rather than panic.
                Err(_) => {
                    let value = Arc::new(init());
                    *entry.into_mut() = value.clone();
                    value
                }
            },
            Entry::Vacant(entry) => {
                let value = Arc::new(init());
                entry.insert(value.clone());
                value
            }
        }
    }

    /// Fallible [`Self::compute_if_absent`]; nothing is stored when the
    /// initializer fails, so a later call retries.
    pub fn try_compute_if_absent<T, E, F>(
        &self,
        key: &AttributeKey<T>,
        init: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }
        let mut values = self.values.write();
        if let Some(existing) = values
            .get(&key.id())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
        {
            return Ok(existing);
        }
        let value = Arc::new(init()?);
        values.insert(key.id(), value.clone());
        Ok(value)
    }
}

impl fmt::Debug for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeMap({} entries)", self.values.read().len())
    }
}
