use axum::{extract::State, http::StatusCode, Json};

use super::{AppState, ErrorResponse};
use crate::settings::UserSettings;

/// Current user settings.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "The active settings blob", body = UserSettings)),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<UserSettings> {
    Json(state.settings.read().await.clone())
}

/// Replace the settings blob. Persisted on every change; the refresh loop
/// picks the new interval up on its next cycle.
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = UserSettings,
    responses(
        (status = 200, description = "Stored settings", body = UserSettings),
        (status = 422, description = "Interval outside the supported set", body = ErrorResponse),
        (status = 500, description = "Persisting failed", body = ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn put_settings(
    State(state): State<AppState>,
    Json(new_settings): Json<UserSettings>,
) -> Result<Json<UserSettings>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = new_settings.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        ));
    }

    if let Err(e) = state.settings_store.save(&new_settings) {
        tracing::error!(error = %e, "Failed to persist settings");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to persist settings".to_string(),
            }),
        ));
    }

    *state.settings.write().await = new_settings.clone();
    Ok(Json(new_settings))
}
