//! Single-key TTL cache with request coalescing.
//!
//! ```text
//! Empty ──get──► Fetching ──ok──► Populated ──ttl──► Expired ──get──► Fetching
//!   ▲               │ err                                               │
//!   │               ▼                                                   │
//!   └── clear ── (unchanged) ◄──────────────────────────────────────────┘
//! ```

use std::{future::Future, panic::AssertUnwindSafe, time::Duration};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::{sync::Mutex, time::Instant};

/// Default lifetime of a cached payload.
pub const DEFAULT_TTL: Duration = Duration::from_millis(30_000);

/// `None` when the fetch panicked.
type InFlight<T, E> = Shared<BoxFuture<'static, Option<Result<T, E>>>>;

/// Last successful payload and when it was stored.
#[derive(Debug, Clone)]
struct CachedStats<T> {
    payload: T,
    fetched_at: Instant,
}

struct Slots<T, E> {
    entry: Option<CachedStats<T>>,
    in_flight: Option<(u64, InFlight<T, E>)>,
    /// Bumped by `clear()` so fetches started earlier are not stored.
    generation: u64,
    next_fetch_id: u64,
}

/// Memoizes one fetch operation for `ttl` and shares a single in-flight
/// fetch between concurrent callers.
///
/// Outputs are cloned to every waiter, so both the payload and the error
/// must be `Clone`. Wrap non-clonable errors in an `Arc`.
pub struct StatsCache<T, E> {
    slots: Mutex<Slots<T, E>>,
    ttl: Duration,
}

impl<T, E> StatsCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entry: None,
                in_flight: None,
                generation: 0,
                next_fetch_id: 0,
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached payload while it is younger than the TTL.
    /// Otherwise joins the in-flight fetch, or starts one with `fetch`.
    ///
    /// A failed fetch leaves the cache as it was and hands the error to
    /// every waiter. A fetch that panics is cleared as well, and the panic
    /// is re-raised in each waiter.
    pub async fn get<F, Fut>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (fetch_id, generation, shared) = {
            let mut slots = self.slots.lock().await;

            if let Some(entry) = &slots.entry {
                if entry.fetched_at.elapsed() < self.ttl {
                    log::debug!("Stats cache hit");
                    return Ok(entry.payload.clone());
                }
            }

            let joined = slots
                .in_flight
                .as_ref()
                .map(|(id, shared)| (*id, shared.clone()));
            match joined {
                Some((id, shared)) => {
                    log::debug!("Joining in-flight stats fetch #{}", id);
                    (id, slots.generation, shared)
                }
                None => {
                    let id = slots.next_fetch_id;
                    slots.next_fetch_id += 1;
                    log::debug!("Starting stats fetch #{}", id);
                    let shared = AssertUnwindSafe(fetch())
                        .catch_unwind()
                        .map(Result::ok)
                        .boxed()
                        .shared();
                    slots.in_flight = Some((id, shared.clone()));
                    (id, slots.generation, shared)
                }
            }
        };

        let result = shared.await;

        let mut slots = self.slots.lock().await;
        // the first waiter to get here settles the fetch for everyone
        if matches!(&slots.in_flight, Some((id, _)) if *id == fetch_id) {
            slots.in_flight = None;
            match &result {
                Some(Ok(payload)) if slots.generation == generation => {
                    slots.entry = Some(CachedStats {
                        payload: payload.clone(),
                        fetched_at: Instant::now(),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(_)) => log::warn!("Stats fetch #{} failed, cache left unchanged", fetch_id),
                None => log::error!("Stats fetch #{} panicked, cache left unchanged", fetch_id),
            }
        }
        drop(slots);

        match result {
            Some(result) => result,
            None => panic!("stats fetch #{} panicked", fetch_id),
        }
    }

    /// Drops the cached payload and forgets any in-flight fetch. The next
    /// `get` always fetches.
    pub async fn clear(&self) {
        let mut slots = self.slots.lock().await;
        slots.entry = None;
        slots.in_flight = None;
        slots.generation += 1;
        log::debug!("Stats cache cleared");
    }

    /// True while a payload is stored, fresh or not.
    pub async fn is_populated(&self) -> bool {
        self.slots.lock().await.entry.is_some()
    }
}

impl<T, E> Default for StatsCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::time::{advance, sleep};

    use super::*;

    /// Counts calls and returns the call number after a short delay.
    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<usize, String>> + use<> {
        let calls = calls.clone();
        move || {
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                sleep(Duration::from_millis(50)).await;
                Ok(n)
            }
            .boxed()
        }
    }

    fn failing_fetch(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<usize, String>> + use<> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("upstream down".to_string())
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_gets_share_one_fetch() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get(counting_fetch(&calls)),
            cache.get(counting_fetch(&calls))
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Ok(1));
        assert_eq!(b, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_waiters_share_the_error() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let slow_failure = {
            let calls = calls.clone();
            move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(50)).await;
                    Err::<usize, _>("boom".to_string())
                }
                .boxed()
            }
        };

        let (a, b) = tokio::join!(cache.get(slow_failure), cache.get(counting_fetch(&calls)));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Err("boom".to_string()));
        assert_eq!(b, Err("boom".to_string()));
        assert!(!cache.is_populated().await);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_fetch_does_not_wedge_the_cache() {
        let cache = Arc::new(StatsCache::<usize, String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let crashed = {
            let cache = cache.clone();
            let fetch = || -> BoxFuture<'static, Result<usize, String>> {
                async { panic!("decoder bug") }.boxed()
            };
            tokio::spawn(async move { cache.get(fetch).await })
        };
        let join_err = crashed.await.unwrap_err();
        assert!(join_err.is_panic());

        assert!(!cache.is_populated().await);
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn serves_from_cache_until_ttl() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(1));

        advance(Duration::from_millis(29_999)).await;
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forces_refetch() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get(counting_fetch(&calls)).await.unwrap();
        cache.clear().await;
        assert!(!cache.is_populated().await);

        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_stale_entry_and_retries() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get(counting_fetch(&calls)).await.unwrap();
        advance(Duration::from_millis(30_001)).await;

        let failed = cache.get(failing_fetch(&calls)).await;
        assert_eq!(failed, Err("upstream down".to_string()));
        assert!(cache.is_populated().await);

        // no cached error, and the stale value is not served either
        let retried = cache.get(counting_fetch(&calls)).await;
        assert_eq!(retried, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_on_empty_cache_is_not_cached() {
        let cache = StatsCache::<usize, String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(cache.get(failing_fetch(&calls)).await.is_err());
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_finishing_after_clear_is_not_stored() {
        let cache = Arc::new(StatsCache::<usize, String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = {
            let cache = cache.clone();
            let fetch = counting_fetch(&calls);
            tokio::spawn(async move { cache.get(fetch).await })
        };
        // let the spawned get start its fetch
        sleep(Duration::from_millis(10)).await;
        cache.clear().await;

        assert_eq!(pending.await.unwrap(), Ok(1));
        assert!(!cache.is_populated().await);
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_ttl() {
        let cache = StatsCache::<usize, String>::with_ttl(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(cache.ttl(), Duration::from_secs(5));

        cache.get(counting_fetch(&calls)).await.unwrap();
        advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get(counting_fetch(&calls)).await, Ok(2));
    }
}
