//! Per-manuscript mutual exclusion for the write path

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::manuscript::ManuscriptId;

/// Registry of one lock per manuscript currently being written.
///
/// Slots are created on demand and dropped again once nobody holds or waits
/// for them, so the registry only grows with concurrent writers.
#[derive(Debug, Default)]
pub struct ManuscriptLocks {
    slots: Mutex<HashMap<ManuscriptId, Arc<Mutex<()>>>>,
}

impl ManuscriptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `id`
    pub fn with_lock<T>(&self, id: &ManuscriptId, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(*id).or_default())
        };

        let result = {
            // The guarded value is `()`, so a poisoned lock carries no broken state.
            let _guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Clones only happen under the registry lock: two references (the map
        // and ours) means no one else is holding or waiting.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(id);
        }
        result
    }

    /// Number of manuscripts with a live slot
    pub fn active(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_slot_released_after_use() {
        let locks = ManuscriptLocks::new();
        let id = ManuscriptId::new();
        let value = locks.with_lock(&id, || 42);
        assert_eq!(value, 42);
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_same_manuscript_is_serialized() {
        let locks = Arc::new(ManuscriptLocks::new());
        let id = ManuscriptId::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    locks.with_lock(&id, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }
}
