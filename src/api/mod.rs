pub mod board;
pub mod settings;
pub mod stations;
pub mod trains;

use std::sync::Arc;

use axum::{routing::get, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::providers::kv::KvStore;
use crate::services::feed::FeedService;
use crate::settings::SettingsStore;
use crate::sync::{BoardStore, SettingsHandle};

#[derive(Clone)]
pub struct AppState {
    /// Cache-or-fetch front for the upstream feed
    pub feed: Arc<FeedService>,
    /// KV database holding the station list
    pub kv: KvStore,
    /// Fixed KV key for this rail network
    pub rail_network: String,
    /// Derived board maintained by the refresh loop
    pub board: BoardStore,
    /// Live user settings
    pub settings: SettingsHandle,
    /// On-disk home of the settings blob
    pub settings_store: Arc<SettingsStore>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/trains", get(trains::get_trains))
        .route("/stations", get(stations::get_stations))
        .route("/board", get(board::get_board))
        .route("/board/stations", get(board::get_board_stations))
        .route("/board/stations/{code}", get(board::get_station_detail))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .with_state(state)
}
