use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViaError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid upstream URL: {0}")]
    UrlError(String),
}

/// Raw upstream response, kept as bytes so the proxy can pass it through
/// untouched.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// HTTP client for the VIA Rail real-time feed.
pub struct ViaClient {
    client: Client,
    upstream_url: String,
    /// The feed rejects unrecognized origins, so outbound requests carry the
    /// upstream's own origin.
    origin: HeaderValue,
}

impl ViaClient {
    pub fn new(upstream_url: String) -> Result<Self, ViaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ViaError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        let origin = origin_of(&upstream_url)?;

        Ok(Self {
            client,
            upstream_url,
            origin,
        })
    }

    /// Canonical upstream URL, shared by every caller as the cache key.
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Fetch the full feed document. Non-2xx statuses come back as responses,
    /// not errors; only transport failures error out.
    pub async fn fetch_feed(&self) -> Result<FeedResponse, ViaError> {
        let response = self
            .client
            .get(&self.upstream_url)
            .header(header::ORIGIN, self.origin.clone())
            .send()
            .await
            .map_err(|e| ViaError::NetworkError(e.to_string()))?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| ViaError::NetworkError(e.to_string()))?;

        Ok(FeedResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Scheme-and-authority origin of a URL, e.g. "https://host" for
/// "https://host/path".
fn origin_of(url: &str) -> Result<HeaderValue, ViaError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| ViaError::UrlError(format!("{}: {}", url, e)))?;
    let scheme = uri
        .scheme_str()
        .ok_or_else(|| ViaError::UrlError(format!("{}: missing scheme", url)))?;
    let authority = uri
        .authority()
        .ok_or_else(|| ViaError::UrlError(format!("{}: missing authority", url)))?;

    HeaderValue::from_str(&format!("{}://{}", scheme, authority))
        .map_err(|e| ViaError::UrlError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path() {
        let origin = origin_of("https://tsimobile.viarail.ca/data/allData.json").unwrap();
        assert_eq!(origin, "https://tsimobile.viarail.ca");

        let origin = origin_of("http://127.0.0.1:8080/feed").unwrap();
        assert_eq!(origin, "http://127.0.0.1:8080");
    }

    #[test]
    fn origin_rejects_relative_urls() {
        assert!(origin_of("/data/allData.json").is_err());
    }
}
