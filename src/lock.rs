//! Per-dataset mutual exclusion.
//!
//! Detection followed by conversion must not interleave with another
//! conversion of the same dataset. Locks are keyed by the normalized dataset
//! path, so two instances pointing at the same directory share one lock.
//! An entry lives only while some caller holds or waits on it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::instance::normalize_path;

#[derive(Debug, Default)]
pub struct DatasetLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DatasetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for the dataset at `path`.
    ///
    /// Blocks while another caller holds the same dataset. Different
    /// datasets never wait on each other.
    pub fn with_dataset<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let key = normalize_path(path);
        let lock = Arc::clone(self.map().entry(key.clone()).or_default());
        let entry = Entry {
            owner: self,
            key,
            lock,
        };

        let _guard = entry
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(dataset = %entry.key.display(), "dataset lock acquired");
        f()
    }

    /// Number of datasets currently locked or waited on.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One caller's hold on a map entry; removes the entry when it is the last.
struct Entry<'a> {
    owner: &'a DatasetLocks,
    key: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Drop for Entry<'_> {
    fn drop(&mut self) {
        let mut map = self.owner.map();
        // The map's copy plus ours.
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_dataset_is_serialized() {
        let locks = Arc::new(DatasetLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                // Spelled differently, normalized to the same key.
                let path = if i % 2 == 0 {
                    "/data/locked-set"
                } else {
                    "/data/./locked-set/"
                };
                thread::spawn(move || {
                    locks.with_dataset(Path::new(path), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        assert_eq!(locks.len(), 1);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn different_datasets_get_distinct_locks() {
        let locks = DatasetLocks::new();
        assert!(locks.is_empty());

        let nested = locks.with_dataset(Path::new("/data/a"), || {
            // Would deadlock if both paths shared a lock.
            locks.with_dataset(Path::new("/data/b"), || locks.len())
        });

        assert_eq!(nested, 2);
        assert!(locks.is_empty());
    }

    #[test]
    fn entries_are_dropped_after_use_and_after_panics() {
        let locks = DatasetLocks::new();
        for i in 0..50 {
            locks.with_dataset(&PathBuf::from(format!("/data/set-{i}")), || ());
        }
        assert!(locks.is_empty());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with_dataset(Path::new("/data/boom"), || -> usize { panic!("conversion blew up") })
        }));
        assert!(result.is_err());
        assert!(locks.is_empty());

        // The same dataset can be locked again afterwards.
        assert_eq!(locks.with_dataset(Path::new("/data/boom"), || 7), 7);
    }
}
