//! Single-flight refresh discipline: concurrent callers that observe an
//! expired token for the same
//! (tenant, service) funnel through one refresh attempt.
//!
//! Grounded on the oauth2-broker's per-`StoreKey` singleflight guard: a
//! per-key async mutex serializes refreshers, and the first one through
//! re-checks the store before calling the provider so a second caller that
//! was merely waiting doesn't refresh again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct RefreshCoordinator {
    locks: Mutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, tenant: &str, service: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("refresh coordinator lock poisoned");
        locks
            .entry((tenant.to_string(), service.to_string()))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Holds the per-(tenant, service) lock for the duration of `f`. Callers
    /// are expected to re-check freshness themselves once the lock is
    /// acquired, since a concurrent refresh may have already completed.
    pub async fn exclusive<F, Fut, T>(&self, tenant: &str, service: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let lock = self.lock_for(tenant, service);
        let _guard = lock.lock().await;
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_serialize_per_key() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .exclusive("tenant-a", "svc", || async {
                        let before = counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        assert_eq!(counter.load(Ordering::SeqCst), before + 1);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn different_keys_run_concurrently() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let a = coordinator.clone();
        let b = coordinator.clone();

        let t1 = tokio::spawn(async move {
            a.exclusive("tenant-a", "svc", || async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            })
            .await;
        });
        let t2 = tokio::spawn(async move {
            b.exclusive("tenant-b", "svc", || async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            })
            .await;
        });

        let start = std::time::Instant::now();
        t1.await.unwrap();
        t2.await.unwrap();
        assert!(start.elapsed() < std::time::Duration::from_millis(35));
    }
}
