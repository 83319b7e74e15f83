use futures_util::future::{BoxFuture, FutureExt, Shared};
use insurance_core::DataError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, DataError>>>;

/// In-flight request registry: at most one upstream call per key at any
/// instant. Concurrent callers for the same key join the existing shared
/// future and observe the same success or the same failure.
///
/// Completed results are not kept; storing history is the cache's job.
pub struct RequestCoordinator<T: Clone> {
    in_flight: Mutex<HashMap<String, SharedFetch<T>>>,
}

impl<T: Clone + Send + Sync + 'static> RequestCoordinator<T> {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `producer` deduplicated under `key`.
    ///
    /// The registration happens before the first await so concurrent callers
    /// observe it, and it is removed after completion on both the success and
    /// the failure path — a failed producer must not leave its key stuck.
    pub async fn run<F, Fut>(&self, key: &str, producer: F) -> Result<T, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        let fetch = {
            let mut map = self.lock_registry();
            match map.get(key) {
                Some(existing) => existing.clone(),
                None => {
                    let shared = producer().boxed().shared();
                    map.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = fetch.clone().await;

        // Deregister whichever waiter gets here first. Compare by identity so
        // a newer request registered under the same key is left alone.
        let mut map = self.lock_registry();
        if let Some(current) = map.get(key) {
            if current.ptr_eq(&fetch) {
                map.remove(key);
            }
        }

        result
    }

    /// Number of keys currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.lock_registry().len()
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedFetch<T>>> {
        // The registry holds no invariants across a panic; recover a
        // poisoned lock instead of propagating it.
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_producer_invocation() {
        let coordinator: RequestCoordinator<String> = RequestCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let producer = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok("statements".to_string())
            }
        };

        let (a, b) = tokio::join!(
            coordinator.run("financials_TRV", producer(calls.clone())),
            coordinator.run("financials_TRV", producer(calls.clone())),
        );

        assert_eq!(a.unwrap(), "statements");
        assert_eq!(b.unwrap(), "statements");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share() {
        let coordinator: RequestCoordinator<i32> = RequestCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        let c2 = calls.clone();
        let (a, b) = tokio::join!(
            coordinator.run("financials_TRV", move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            }),
            coordinator.run("financials_PGR", move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            }),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter_and_clears_the_key() {
        let coordinator: RequestCoordinator<i32> = RequestCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(DataError::NotFound("no such carrier".to_string()))
            }
        };

        let (a, b) = tokio::join!(
            coordinator.run("financials_ZZZZ", failing(calls.clone())),
            coordinator.run("financials_ZZZZ", failing(calls.clone())),
        );
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The key deregistered on failure, so a retry invokes the producer
        // again rather than replaying the old rejection.
        let retry = coordinator
            .run("financials_ZZZZ", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await;
        assert_eq!(retry.unwrap(), 99);
        assert_eq!(coordinator.in_flight_count(), 0);
    }
}
