use std::{sync::Arc, time::Duration};

use common::{
    error::{AppError, Res},
    session::Session,
};
use dashmap::DashMap;
use futures::{FutureExt, future::BoxFuture};
use tokio::time::Instant;

use crate::{cache::StatsCache, models::stats::StatsPayload, services::client::StatsClient};

/// Cache of one session's stats. Errors are shared between coalesced callers.
pub type SessionStatsCache = StatsCache<StatsPayload, Arc<AppError>>;

/// How long a session's cache survives without requests.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Where stats come from. The server uses [`StatsClient`].
pub trait StatsSource: Send + Sync + 'static {
    fn fetch(&self, token: String) -> BoxFuture<'static, Res<StatsPayload>>;
}

impl StatsSource for StatsClient {
    fn fetch(&self, token: String) -> BoxFuture<'static, Res<StatsPayload>> {
        let client = self.clone();
        async move { client.fetch_stats(&token).await }.boxed()
    }
}

struct SessionEntry {
    cache: Arc<SessionStatsCache>,
    last_used: Instant,
}

/// One [`StatsCache`] per session token, so stats never cross users.
///
/// Entries are created on first use and dropped again when the backend
/// rejects the token (401/403), when the session calls `evict`, or by
/// [`purge_idle`](Self::purge_idle) once unused for the idle timeout.
pub struct StatsRegistry {
    caches: DashMap<String, SessionEntry>,
    source: Arc<dyn StatsSource>,
    ttl: Duration,
    idle_timeout: Duration,
}

impl StatsRegistry {
    pub fn new(source: Arc<dyn StatsSource>, ttl: Duration) -> Self {
        Self {
            caches: DashMap::new(),
            source,
            ttl,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn cache_for(&self, session: &Session) -> Arc<SessionStatsCache> {
        let now = Instant::now();
        self.caches
            .entry(session.token.clone())
            .and_modify(|entry| entry.last_used = now)
            .or_insert_with(|| SessionEntry {
                cache: Arc::new(StatsCache::with_ttl(self.ttl)),
                last_used: now,
            })
            .cache
            .clone()
    }

    /// Stats for `session`, from memory while fresh.
    ///
    /// A token the backend rejects loses its cache entry, so unknown or
    /// expired tokens never accumulate.
    pub async fn get(&self, session: &Session) -> Res<StatsPayload> {
        let cache = self.cache_for(session);
        let source = self.source.clone();
        let token = session.token.clone();

        let result = cache
            .get(move || source.fetch(token).map(|res| res.map_err(Arc::new)))
            .await
            .map_err(AppError::from);

        if let Err(err) = &result {
            if let Some(status @ (401 | 403)) = err.upstream_status() {
                // only drop the entry this call used, not one created since
                let removed = self
                    .caches
                    .remove_if(&session.token, |_, entry| Arc::ptr_eq(&entry.cache, &cache))
                    .is_some();
                if removed {
                    log::debug!("Backend rejected session token ({}), cache dropped", status);
                }
            }
        }

        result
    }

    /// Drops the session's cached stats and fetches them again.
    pub async fn refresh(&self, session: &Session) -> Res<StatsPayload> {
        self.cache_for(session).clear().await;
        self.get(session).await
    }

    /// Forgets the session's cache. Returns whether one existed.
    pub fn evict(&self, session: &Session) -> bool {
        self.caches.remove(&session.token).is_some()
    }

    /// Drops every session cache unused for longer than the idle timeout.
    /// Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        let before = self.caches.len();
        self.caches
            .retain(|_, entry| entry.last_used.elapsed() < self.idle_timeout);
        let removed = before.saturating_sub(self.caches.len());
        if removed > 0 {
            log::info!("Purged {} idle stats session(s)", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
