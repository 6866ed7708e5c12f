//! Row-scoped locks.
//!
//! `RocksDB` has no notion of "select for update", so the store keeps its own table
//! of held row keys. A [`RowGuard`] is held for the duration of one logical
//! operation (read, check, write) and releases the row when dropped.
//!
//! Row locks are not reentrant: an operation must acquire each row at most once.
//!
//! Locks are synchronous. Waiting parks the calling thread, so from async code
//! a guard must only be taken and dropped inside synchronous helpers that never
//! cross an `.await`, keeping the hold short enough that a blocked runtime
//! worker is released quickly.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockTable {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// A table of exclusive row locks keyed by string.
#[derive(Debug, Clone, Default)]
pub struct RowLocks {
    table: Arc<LockTable>,
}

impl RowLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the current thread until the row is free, then take it.
    #[must_use]
    pub fn lock(&self, key: impl Into<String>) -> RowGuard {
        let key = key.into();
        let mut held = self.table.held.lock();
        while held.contains(&key) {
            self.table.released.wait(&mut held);
        }
        held.insert(key.clone());
        RowGuard {
            key,
            table: Arc::clone(&self.table),
        }
    }

    /// Check whether a row is currently held.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.table.held.lock().contains(key)
    }
}

/// An exclusive hold on one row. The row is released on drop.
#[derive(Debug)]
#[must_use = "the row is released as soon as the guard is dropped"]
pub struct RowGuard {
    key: String,
    table: Arc<LockTable>,
}

impl RowGuard {
    /// The key of the held row.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        self.table.held.lock().remove(&self.key);
        self.table.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn guard_releases_on_drop() {
        let locks = RowLocks::new();
        let guard = locks.lock("host:a");
        assert!(locks.is_locked("host:a"));
        assert_eq!(guard.key(), "host:a");
        drop(guard);
        assert!(!locks.is_locked("host:a"));
    }

    #[test]
    fn distinct_rows_do_not_block() {
        let locks = RowLocks::new();
        let _a = locks.lock("host:a");
        let _b = locks.lock("host:b");
        assert!(locks.is_locked("host:a"));
        assert!(locks.is_locked("host:b"));
    }

    #[test]
    fn same_row_waits_for_release() {
        let locks = RowLocks::new();
        let acquired = Arc::new(AtomicBool::new(false));

        let guard = locks.lock("host:a");
        let handle = {
            let locks = locks.clone();
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = locks.lock("host:a");
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(guard);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }
}
