use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// One stored proxy response. Headers are captured as decorated at store
/// time, so a hit replays them unmodified.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    stored_at: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Shared response cache keyed by canonical upstream URL. Entries expire
/// after the freshness window; concurrent fills race and the last writer
/// wins.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry. Stale entries count as absent and are evicted
    /// lazily on the next insert.
    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.is_fresh(self.ttl)).cloned()
    }

    pub async fn insert(&self, key: String, response: CachedResponse) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.is_fresh(ttl));
        entries.insert(key, response);
    }
}
