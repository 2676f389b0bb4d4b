use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-poll write locks. Mutations to one poll are serialized; distinct
/// polls proceed fully in parallel. Readers never touch these.
pub struct PollLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl PollLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn acquire(&self, poll_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(poll_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry once the poll itself is gone.
    pub fn forget(&self, poll_id: i64) {
        self.locks.remove(&poll_id);
    }
}

impl Default for PollLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn same_poll_sections_never_overlap() {
        let locks = Arc::new(PollLocks::new());
        let in_section = Arc::new(AtomicI64::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn distinct_polls_do_not_contend() {
        let locks = PollLocks::new();
        let _one = locks.acquire(1).await;
        // Would deadlock if poll 2 shared poll 1's mutex.
        let _two = locks.acquire(2).await;
    }
}
