//! Per-user serialisation of activity tree mutations.

use std::sync::Arc;

use dashmap::DashMap;
use database::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user, created on first use.
///
/// Insert, mute, unmute, delete and import hold the user's guard for their
/// whole read-modify-write sequence, so propagation never interleaves with
/// another mutation of the same tree.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the user's tree.
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(user_id).or_default().clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_user_is_serialised() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire the lock")
            .unwrap();
    }

    #[tokio::test]
    async fn test_users_do_not_block_each_other() {
        let locks = UserLocks::new();
        let _first = locks.lock(1).await;
        tokio::time::timeout(Duration::from_millis(100), locks.lock(2))
            .await
            .expect("other user should not wait");
    }
}
