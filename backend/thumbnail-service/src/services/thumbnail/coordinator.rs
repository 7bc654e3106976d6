//! Generation coordinator - coalesces concurrent work per cache key
//!
//! The first caller for a key spawns the work as a detached task and
//! registers a watch channel for it. Later callers for the same key
//! subscribe to that channel instead of starting their own run. The
//! registry entry is removed as soon as the work finishes, so failures are
//! never remembered and a later request starts fresh.

use crate::error::{AppError, Result};
use crate::metrics;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

type Outcome<T> = Option<Result<T>>;

/// In-flight registry keyed by cache key.
pub struct GenerationCoordinator<T> {
    in_flight: Arc<DashMap<String, watch::Receiver<Outcome<T>>>>,
}

impl<T> Clone for GenerationCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<T> Default for GenerationCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GenerationCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Run `work` for `key` unless a run is already in flight, in which case
    /// wait for that run and return a clone of its outcome.
    ///
    /// `work` is only polled when this caller becomes the leader. It runs on
    /// its own task, so dropping the returned future does not cancel it.
    pub async fn run_once<F>(&self, key: &str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut rx = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!(key, "Joining in-flight generation");
                metrics::record_coalesced_waiter();
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx.clone());

                let guard = InFlightGuard {
                    registry: self.in_flight.clone(),
                    key: key.to_string(),
                };
                tokio::spawn(async move {
                    let outcome = work.await;
                    // Drop the entry before publishing so nobody can join a
                    // finished run after the last waiter has been released.
                    drop(guard);
                    let _ = tx.send(Some(outcome));
                });
                rx
            }
        };

        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| AppError::Internal(format!("generation for {key} was aborted")))?;

        match outcome.as_ref() {
            Some(result) => result.clone(),
            None => Err(AppError::Internal(format!("generation for {key} produced nothing"))),
        }
    }

    /// Number of keys currently being generated.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Removes the registry entry when the run ends, including by panic.
struct InFlightGuard<T> {
    registry: Arc<DashMap<String, watch::Receiver<Outcome<T>>>>,
    key: String,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let coordinator = GenerationCoordinator::<u32>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coordinator = coordinator.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .run_once("photo.gif.png", async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let coordinator = GenerationCoordinator::<String>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for key in ["a.png.png", "b.png.png", "c.png.png"] {
            let coordinator = coordinator.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .run_once(key, async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(key.to_string())
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(results, vec!["a.png.png", "b.png.png", "c.png.png"]);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_cached() {
        let coordinator = GenerationCoordinator::<u32>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let first = {
            let runs = runs.clone();
            coordinator.run_once("bad.gif.png", async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err(AppError::Decode("truncated".into()))
            })
        };
        let second = {
            let runs = runs.clone();
            coordinator.run_once("bad.gif.png", async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
        };

        let (a, b) = tokio::join!(first, second);
        assert!(matches!(a, Err(AppError::Decode(_))));
        assert!(matches!(b, Err(AppError::Decode(_))));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let retry = coordinator
            .run_once("bad.gif.png", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(retry, 7);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_cancel_work() {
        let coordinator = GenerationCoordinator::<u32>::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let done = finished.clone();
        let caller = coordinator.run_once("slow.png.png", async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            done.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });

        // Give up on the request almost immediately.
        let _ = tokio::time::timeout(Duration::from_millis(5), caller).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);
    }

    fn explode() -> Result<u32> {
        panic!("encoder exploded")
    }

    #[tokio::test]
    async fn test_panicking_work_releases_key() {
        let coordinator = GenerationCoordinator::<u32>::new();

        let err = coordinator
            .run_once("boom.png.png", async { explode() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(coordinator.in_flight(), 0);

        let value = coordinator
            .run_once("boom.png.png", async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }
}
