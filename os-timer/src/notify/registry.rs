/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Process-wide map from registry key to live timer callback.
//!
//! The kernel is given a key, never a pointer.  A notification thread that
//! wakes up after its timer was deleted finds no entry and does nothing, so
//! the callback and its context can be freed as soon as the timer is gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::Fire;

/// Registry key.  Pointer-sized so it travels unchanged in `sival_ptr`.
/// Keys start at 1 and are not reused until the counter wraps.
pub(crate) type Key = usize;

static NEXT_KEY: AtomicUsize = AtomicUsize::new(1);
static ENTRIES: OnceLock<Mutex<HashMap<Key, Arc<dyn Fire>>>> = OnceLock::new();

fn entries() -> &'static Mutex<HashMap<Key, Arc<dyn Fire>>> {
    ENTRIES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Reserves a fresh key.
pub(crate) fn next_key() -> Key {
    NEXT_KEY.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn insert(key: Key, entry: Arc<dyn Fire>) {
    entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, entry);
}

/// Returns a clone of the entry so the lock is not held while it runs.
pub(crate) fn lookup(key: Key) -> Option<Arc<dyn Fire>> {
    entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned()
}

pub(crate) fn remove(key: Key) -> Option<Arc<dyn Fire>> {
    entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&key)
}

#[cfg(test)]
pub(crate) fn contains(key: Key) -> bool {
    entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(AtomicUsize);

    impl Fire for Counter {
        fn notify(self: Arc<Self>) {
            self.invoke();
        }

        fn invoke(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn keys_are_unique() {
        let a = next_key();
        let b = next_key();
        assert_ne!(a, b);
        assert!(a > 0 && b > 0);
    }

    #[test]
    fn lookup_after_remove_finds_nothing() {
        let key = next_key();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        insert(key, counter.clone());

        lookup(key).expect("entry was inserted").notify();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        assert!(remove(key).is_some());
        assert!(lookup(key).is_none());
        assert!(!contains(key));
    }
}
