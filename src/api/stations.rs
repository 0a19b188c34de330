use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::{AppState, ErrorResponse};
use crate::providers::kv::KvStore;

/// Station list payload as stored in KV: `[code, name, [lat, lng]]` tuples.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationListResponse {
    #[schema(value_type = Object)]
    pub stations: serde_json::Value,
}

/// Serve the static station list for the configured rail network.
#[utoipa::path(
    get,
    path = "/api/stations",
    responses(
        (status = 200, description = "Station tuples under a `stations` field", body = StationListResponse),
        (status = 500, description = "Key absent or lookup failed", body = ErrorResponse)
    ),
    tag = "stations"
)]
pub async fn get_stations(
    State(state): State<AppState>,
) -> Result<Json<StationListResponse>, (StatusCode, Json<ErrorResponse>)> {
    fetch_stations(&state.kv, &state.rail_network).await.map(Json)
}

/// KV lookup with the endpoint's error contract: an absent key and a failed
/// lookup both surface as 500 payloads with distinct messages.
async fn fetch_stations(
    kv: &KvStore,
    rail_network: &str,
) -> Result<StationListResponse, (StatusCode, Json<ErrorResponse>)> {
    match kv.get_json(rail_network).await {
        Ok(Some(stations)) => Ok(StationListResponse { stations }),
        Ok(None) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "No data returned from KV".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!(error = %e, "KV lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Error fetching train station data from KV".to_string(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::kv::test_pool;

    #[tokio::test]
    async fn absent_key_is_a_500_with_the_kv_message() {
        let kv = KvStore::new(test_pool().await);
        let (status, Json(body)) = fetch_stations(&kv, "VIA Rail").await.unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "No data returned from KV");
    }

    #[tokio::test]
    async fn lookup_failure_is_a_500_with_the_fetch_message() {
        let pool = test_pool().await;
        sqlx::query("DROP TABLE kv").execute(&pool).await.unwrap();

        let kv = KvStore::new(pool);
        let (status, Json(body)) = fetch_stations(&kv, "VIA Rail").await.unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Error fetching train station data from KV");
    }

    #[tokio::test]
    async fn stored_list_is_served_under_a_stations_field() {
        let kv = KvStore::new(test_pool().await);
        kv.seed_from_file("VIA Rail", "data/stations.json")
            .await
            .unwrap();

        let response = fetch_stations(&kv, "VIA Rail").await.unwrap();
        let tuples = response.stations.as_array().unwrap();
        assert!(!tuples.is_empty());
        assert_eq!(tuples[0][0], "TRTO");
    }
}
