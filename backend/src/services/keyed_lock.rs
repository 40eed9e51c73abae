use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use and dropped again once nobody holds or
/// waits on it.
///
/// Holding the returned guard serialises every read-modify-write done under the same key,
/// while work on other keys proceeds in parallel.
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

pub struct KeyedGuard<'a, K>
where
    K: Eq + Hash,
{
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        // Clone the Arc out so the shard lock is released before awaiting
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }
}

impl<K> Drop for KeyedGuard<'_, K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone, so a count of one means the map is the last owner
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialised() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let guard = locks.lock("AAPL".to_string()).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("AAPL".to_string()).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(locks.locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<String>::new();
        let _aapl = locks.lock("AAPL".to_string()).await;
        let msft = tokio::time::timeout(Duration::from_millis(50), locks.lock("MSFT".to_string())).await;
        assert!(msft.is_ok());
    }

    #[tokio::test]
    async fn test_idle_keys_are_released() {
        let locks = KeyedLocks::<String>::new();
        {
            let _aapl = locks.lock("AAPL".to_string()).await;
            let _msft = locks.lock("MSFT".to_string()).await;
            assert_eq!(locks.locks.len(), 2);
        }
        assert!(locks.locks.is_empty());

        let _aapl = locks.lock("AAPL".to_string()).await;
        assert_eq!(locks.locks.len(), 1);
    }
}
