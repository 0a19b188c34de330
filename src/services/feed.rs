use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::providers::via::{ViaClient, ViaError};
use crate::services::cache::{CachedResponse, ResponseCache};

/// Cache-or-fetch front for the upstream feed: the edge proxy behavior
/// behind `/api/trains`, also used by the board refresh loop.
pub struct FeedService {
    client: ViaClient,
    cache: Arc<ResponseCache>,
    cache_control: HeaderValue,
}

impl FeedService {
    pub fn new(client: ViaClient, cache: Arc<ResponseCache>, ttl: Duration) -> Self {
        let cache_control = HeaderValue::from_str(&format!("max-age={}", ttl.as_secs()))
            .unwrap_or_else(|_| HeaderValue::from_static("max-age=30"));
        Self {
            client,
            cache,
            cache_control,
        }
    }

    /// Serve the feed for a caller identified by `caller_origin`, the value
    /// echoed into `Access-Control-Allow-Origin`.
    ///
    /// Hits replay the stored response, headers included. Misses fetch
    /// upstream, decorate, reply, and persist in a detached task: the reply
    /// does not wait for the cache write, and there is no visibility
    /// guarantee relative to the next request. Concurrent misses each fetch
    /// upstream independently.
    pub async fn get_feed(&self, caller_origin: &str) -> Result<CachedResponse, ViaError> {
        let key = self.client.upstream_url();

        if let Some(hit) = self.cache.get(key).await {
            debug!("cache hit");
            return Ok(hit);
        }
        debug!("cache miss");

        let upstream = self.client.fetch_feed().await?;

        let mut headers = HeaderMap::new();
        if let Some(content_type) = upstream.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        match HeaderValue::from_str(caller_origin) {
            Ok(origin) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
            Err(e) => warn!(error = %e, "Caller origin not header-safe, omitting CORS echo"),
        }
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());

        let response = CachedResponse::new(upstream.status, headers, upstream.body);

        if upstream.status.is_success() {
            let cache = self.cache.clone();
            let key = key.to_string();
            let stored = response.clone();
            tokio::spawn(async move {
                cache.insert(key, stored).await;
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loopback listener standing in for the upstream feed. Returns its URL
    /// and a hit counter.
    async fn spawn_upstream(status: StatusCode, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler_hits = hits.clone();
        let app = Router::new().route(
            "/data/allData.json",
            get(move || {
                let hits = handler_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/data/allData.json", addr), hits)
    }

    fn make_service(url: String, ttl: Duration) -> FeedService {
        let client = ViaClient::new(url).unwrap();
        FeedService::new(client, Arc::new(ResponseCache::new(ttl)), ttl)
    }

    /// The write-back is detached, so tests wait for it to land instead of
    /// assuming visibility right after the miss returns.
    async fn wait_for_write_back(service: &FeedService) {
        for _ in 0..200 {
            if service
                .cache
                .get(service.client.upstream_url())
                .await
                .is_some()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache write-back never landed");
    }

    #[tokio::test]
    async fn second_request_within_ttl_hits_cache() {
        let (url, hits) = spawn_upstream(StatusCode::OK, r#"{"123":{}}"#).await;
        let service = make_service(url, Duration::from_secs(30));

        let first = service.get_feed("https://example.org").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        wait_for_write_back(&service).await;

        let second = service.get_feed("https://example.org").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn responses_carry_cors_headers_on_miss_and_hit() {
        let (url, _) = spawn_upstream(StatusCode::OK, "{}").await;
        let service = make_service(url, Duration::from_secs(30));

        let miss = service.get_feed("https://site-a.example").await.unwrap();
        assert_eq!(
            miss.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://site-a.example"
        );
        assert_eq!(miss.headers.get(header::VARY).unwrap(), "Origin");
        assert_eq!(miss.headers.get(header::CACHE_CONTROL).unwrap(), "max-age=30");

        wait_for_write_back(&service).await;

        // A hit replays the response as stored, including the first caller's
        // echoed origin.
        let hit = service.get_feed("https://site-b.example").await.unwrap();
        assert_eq!(
            hit.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://site-a.example"
        );
        assert_eq!(hit.headers.get(header::VARY).unwrap(), "Origin");
    }

    #[tokio::test]
    async fn non_success_upstream_passes_through_uncached() {
        let (url, hits) = spawn_upstream(StatusCode::SERVICE_UNAVAILABLE, "upstream down").await;
        let service = make_service(url, Duration::from_secs(30));

        let first = service.get_feed("https://example.org").await.unwrap();
        assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(first
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some());

        // Nothing was stored, so the next request fetches again.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = service.get_feed("https://example.org").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_new_fetch() {
        let (url, hits) = spawn_upstream(StatusCode::OK, "{}").await;
        let service = make_service(url, Duration::from_millis(50));

        let _ = service.get_feed("https://example.org").await.unwrap();
        wait_for_write_back(&service).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let _ = service.get_feed("https://example.org").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_failure_surfaces_as_error() {
        // Nothing listens on this port.
        let service = make_service(
            "http://127.0.0.1:9/data/allData.json".to_string(),
            Duration::from_secs(30),
        );
        assert!(matches!(
            service.get_feed("https://example.org").await,
            Err(ViaError::NetworkError(_))
        ));
    }
}
