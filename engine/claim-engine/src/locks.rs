//! Per-resource locks serializing work on contested players, picks and trades

use dashmap::DashMap;
use roster_ledger::{PickId, PlayerId, TeamId, TradeId};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A contested resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Player(PlayerId),
    Pick(PickId),
    Trade(TradeId),
    Team(TeamId),
}

/// Lock table keyed by resource
#[derive(Debug, Default)]
pub struct ResourceLocks {
    locks: DashMap<Resource, Arc<Mutex<()>>>,
}

/// Held locks; released on drop
#[derive(Debug)]
pub struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
    resources: Vec<Resource>,
}

impl LockSet {
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

impl ResourceLocks {
    /// Create a new empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every resource in sorted order
    pub async fn acquire(&self, resources: impl IntoIterator<Item = Resource>) -> LockSet {
        let mut resources: Vec<Resource> = resources.into_iter().collect();
        resources.sort_unstable();
        resources.dedup();

        let mut guards = Vec::with_capacity(resources.len());
        for resource in &resources {
            // No shard lock may be held across the await
            let mutex = self.locks.entry(*resource).or_default().value().clone();
            guards.push(mutex.lock_owned().await);
        }

        LockSet { _guards: guards, resources }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_locks_are_sorted_and_deduplicated() {
        let locks = ResourceLocks::new();
        let set = locks
            .acquire([Resource::Trade(1), Resource::Player(9), Resource::Player(2), Resource::Player(9)])
            .await;
        assert_eq!(set.resources(), &[Resource::Player(2), Resource::Player(9), Resource::Trade(1)]);
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_contended_resource_waits() {
        let locks = Arc::new(ResourceLocks::new());
        let held = locks.acquire([Resource::Pick(7)]).await;

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _set = other.acquire([Resource::Player(1), Resource::Pick(7)]).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }
}
