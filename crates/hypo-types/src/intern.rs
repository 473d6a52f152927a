//! Process-wide interning of type values.
//!
//! Every type value has a stable intern key equal to its internal form. The
//! tables live for the whole process; equality and hashing on the public
//! handle types reduce to pointer identity on the interned node.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

pub(crate) struct Interner<T> {
    map: Mutex<HashMap<String, Arc<T>>>,
}

impl<T> Interner<T> {
    pub(crate) fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `key`, building and inserting the node on first use.
    ///
    /// The builder receives the owned key so nodes can store their internal
    /// form without a second allocation.
    pub(crate) fn intern(&self, key: &str, build: impl FnOnce(String) -> T) -> Arc<T> {
        let mut map = self.map.lock();
        if let Some(existing) = map.get(key) {
            return Arc::clone(existing);
        }
        let node = Arc::new(build(key.to_owned()));
        map.insert(key.to_owned(), Arc::clone(&node));
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedups_equal_keys() {
        let interner: Interner<String> = Interner::new();
        let a = interner.intern("I", |k| k);
        let b = interner.intern("I", |k| k);
        assert!(Arc::ptr_eq(&a, &b));
        let c = interner.intern("J", |k| k);
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
