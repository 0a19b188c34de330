use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{AppState, ErrorResponse};
use crate::models::{MapBounds, Station, StopTime, Train, TrainStatus};
use crate::services::board::{route_bounds, TrainBoard};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BoardQuery {
    /// Restrict the train list to one lifecycle bucket. Defaults to the
    /// user's saved list filter.
    pub status: Option<TrainStatus>,
    /// Selected train id: switches the bounds to its route, via static
    /// station coordinates.
    pub train: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BoardResponse {
    /// Trains matching the status filter ("all" returns the full map).
    pub trains: HashMap<String, Train>,
    /// Full categorization of the current feed.
    pub board: TrainBoard,
    /// Bounds for the map: the selected train's route, else all active
    /// trains.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub bounds: Option<MapBounds>,
    pub updated_at: Option<String>,
}

/// The derived train board from the last successful refresh.
#[utoipa::path(
    get,
    path = "/api/board",
    params(BoardQuery),
    responses(
        (status = 200, description = "Categorized trains, bounds and refresh time", body = BoardResponse),
        (status = 404, description = "Selected train not in the feed", body = ErrorResponse)
    ),
    tag = "board"
)]
pub async fn get_board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<BoardResponse>, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state.board.read().await.clone();

    let status = match query.status {
        Some(status) => status,
        None => state.settings.read().await.train_list_status,
    };

    let trains: HashMap<String, Train> = match status {
        TrainStatus::All => snapshot.trains.clone(),
        _ => snapshot
            .trains
            .iter()
            .filter(|(_, train)| train.status() == status)
            .map(|(id, train)| (id.clone(), train.clone()))
            .collect(),
    };

    let bounds = match &query.train {
        Some(train_id) => {
            let train = snapshot.trains.get(train_id).ok_or_else(|| {
                (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: format!("Unknown train: {}", train_id),
                    }),
                )
            })?;
            route_bounds(train, &snapshot.stations)
        }
        None => snapshot.board.bounds,
    };

    Ok(Json(BoardResponse {
        trains,
        board: snapshot.board,
        bounds,
        updated_at: snapshot.updated_at,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StationBoardResponse {
    /// Stations keyed by code, counts joined against the current feed.
    pub stations: HashMap<String, Station>,
    pub updated_at: Option<String>,
}

/// Stations with their scheduled-stop counts.
#[utoipa::path(
    get,
    path = "/api/board/stations",
    responses(
        (status = 200, description = "Station records keyed by code", body = StationBoardResponse)
    ),
    tag = "board"
)]
pub async fn get_board_stations(State(state): State<AppState>) -> Json<StationBoardResponse> {
    let snapshot = state.board.read().await;
    Json(StationBoardResponse {
        stations: snapshot.stations.clone(),
        updated_at: snapshot.updated_at.clone(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StationStopEvent {
    /// Train id of the visit
    pub train: String,
    pub stop: StopTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StationDetailResponse {
    pub code: String,
    pub station: Station,
    /// Every stop in the current feed referencing this station.
    pub stops: Vec<StationStopEvent>,
}

/// One station plus every train stopping there today.
#[utoipa::path(
    get,
    path = "/api/board/stations/{code}",
    params(("code" = String, Path, description = "Station code")),
    responses(
        (status = 200, description = "Station and its scheduled stops", body = StationDetailResponse),
        (status = 404, description = "Unknown station code", body = ErrorResponse)
    ),
    tag = "board"
)]
pub async fn get_station_detail(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<StationDetailResponse>, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state.board.read().await.clone();

    let station = snapshot.stations.get(&code).cloned().ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Unknown station: {}", code),
            }),
        )
    })?;

    let mut stops = Vec::new();
    for (train_id, train) in &snapshot.trains {
        for stop in &train.times {
            if stop.code == code {
                stops.push(StationStopEvent {
                    train: train_id.clone(),
                    stop: stop.clone(),
                });
            }
        }
    }
    stops.sort_by(|a, b| {
        a.stop
            .scheduled
            .cmp(&b.stop.scheduled)
            .then_with(|| a.train.cmp(&b.train))
    });

    Ok(Json(StationDetailResponse {
        code,
        station,
        stops,
    }))
}
