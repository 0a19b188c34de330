use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use super::{AppState, ErrorResponse};

/// Proxy the upstream feed through the shared response cache.
///
/// The CORS echo target is the caller's `Origin` header, falling back to the
/// request's own URL. Cache hits replay the stored response unmodified,
/// headers included.
#[utoipa::path(
    get,
    path = "/api/trains",
    responses(
        (status = 200, description = "Raw upstream feed document, shared-cached for the configured freshness window"),
        (status = 502, description = "Upstream fetch failed", body = ErrorResponse)
    ),
    tag = "trains"
)]
pub async fn get_trains(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let caller = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uri.to_string());

    match state.feed.get_feed(&caller).await {
        Ok(feed) => {
            let mut response = (feed.status, feed.body).into_response();
            *response.headers_mut() = feed.headers;
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream feed fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Upstream fetch failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}
