use std::sync::Arc;

use dashmap::DashMap;
use ratewall_domain::SubjectKind;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-subject lock table serializing decisions for the same subject.
///
/// Subjects never share a lock. The table is soft-bounded: once it holds
/// more than `capacity` entries, entries nobody holds or waits on are swept.
#[derive(Clone)]
pub struct SubjectLocks {
    inner: Arc<SubjectLocksInner>,
}

struct SubjectLocksInner {
    capacity: usize,
    locks: DashMap<(SubjectKind, String), Arc<Mutex<()>>>,
}

impl SubjectLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(SubjectLocksInner {
                capacity: capacity.max(1),
                locks: DashMap::new(),
            }),
        }
    }

    /// Waits for exclusive access to a subject.
    pub async fn acquire(&self, kind: SubjectKind, subject: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .locks
            .entry((kind, subject.to_owned()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        if self.inner.locks.len() > self.inner.capacity {
            self.sweep();
        }

        lock.lock_owned().await
    }

    /// Removes entries that are neither held nor awaited. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        let before = self.inner.locks.len();
        self.inner
            .locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.inner.locks.len())
    }

    /// Returns the number of tracked subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.locks.len()
    }

    /// Returns true when no subject is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.locks.is_empty()
    }
}

impl Default for SubjectLocks {
    fn default() -> Self {
        Self::new(10_000)
    }
}
