//! Shared board state and the background refresh loop.
//!
//! The loop goes through the same cache-or-fetch path as the `/api/trains`
//! proxy, so a refresh inside the cache window costs no upstream request.
//! Each cycle awaits its refresh before sleeping again; ticks never overlap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::{Station, StationTuple, Train};
use crate::providers::kv::KvStore;
use crate::services::board::{self, TrainBoard};
use crate::services::feed::FeedService;
use crate::settings::UserSettings;

/// Full derived snapshot, replaced field-group-wise under one lock so
/// readers never observe a partial categorization.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    /// Raw train map from the last successful refresh, `next` included.
    pub trains: HashMap<String, Train>,
    pub board: TrainBoard,
    /// Stations with joined scheduled-stop counts.
    pub stations: HashMap<String, Station>,
    /// RFC 3339 time of the last successful train refresh.
    pub updated_at: Option<String>,
}

/// Shared handle the API reads and the refresh loop writes.
pub type BoardStore = Arc<RwLock<BoardSnapshot>>;

/// Live settings shared between the API and the refresh loop.
pub type SettingsHandle = Arc<RwLock<UserSettings>>;

/// Maintains the board: one immediate load at startup, then train refreshes
/// paced by the user's auto-refresh settings.
pub struct RefreshManager {
    feed: Arc<FeedService>,
    kv: KvStore,
    rail_network: String,
    settings: SettingsHandle,
    /// Origin the loop identifies itself with on cache misses.
    origin: String,
    store: BoardStore,
    static_stations: RwLock<HashMap<String, Station>>,
}

impl RefreshManager {
    pub fn new(
        feed: Arc<FeedService>,
        kv: KvStore,
        rail_network: String,
        settings: SettingsHandle,
        origin: String,
    ) -> Self {
        Self {
            feed,
            kv,
            rail_network,
            settings,
            origin,
            store: Arc::new(RwLock::new(BoardSnapshot::default())),
            static_stations: RwLock::new(HashMap::new()),
        }
    }

    /// Get a reference to the board store for API access.
    pub fn board_store(&self) -> BoardStore {
        self.store.clone()
    }

    /// Initial station + train load, then the settings-paced refresh loop.
    /// The interval and the auto-refresh toggle are re-read every cycle, so
    /// settings changes apply without a restart.
    pub async fn start(self: Arc<Self>) {
        info!("Starting board refresh");
        self.refresh_stations().await;
        self.refresh_trains().await;

        loop {
            let (auto_refresh, interval) = {
                let settings = self.settings.read().await;
                (settings.auto_refresh, settings.refresh_interval)
            };

            tokio::time::sleep(Duration::from_secs(interval)).await;

            if auto_refresh {
                self.refresh_trains().await;
            }
        }
    }

    /// Fetch the feed through the shared cache path and rebuild the board.
    /// Any failure leaves the previous snapshot untouched.
    pub async fn refresh_trains(&self) {
        let response = match self.feed.get_feed(&self.origin).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Feed fetch failed, keeping previous board");
                return;
            }
        };

        if !response.status.is_success() {
            warn!(status = %response.status, "Feed refresh failed, keeping previous board");
            return;
        }

        let mut trains: HashMap<String, Train> = match serde_json::from_slice(&response.body) {
            Ok(trains) => trains,
            Err(e) => {
                warn!(error = %e, "Failed to parse feed, keeping previous board");
                return;
            }
        };

        let train_board = board::partition(&mut trains);
        let static_stations = self.static_stations.read().await.clone();
        let stations = board::join_station_counts(&static_stations, &trains);

        info!(
            active = train_board.active.len(),
            departed = train_board.departed.len(),
            arrived = train_board.arrived.len(),
            scheduled = train_board.scheduled.len(),
            "Refreshed train board"
        );

        let mut snapshot = self.store.write().await;
        snapshot.board = train_board;
        snapshot.stations = stations;
        snapshot.trains = trains;
        snapshot.updated_at = Some(Utc::now().to_rfc3339());
    }

    /// Load the static station list from the KV store. Absence or failure is
    /// logged and the previous list stays in place.
    pub async fn refresh_stations(&self) {
        let tuples: Vec<StationTuple> = match self.kv.get_json(&self.rail_network).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(tuples) => tuples,
                Err(e) => {
                    warn!(error = %e, "Station list in KV has unexpected shape");
                    return;
                }
            },
            Ok(None) => {
                warn!(network = %self.rail_network, "No station list in KV");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read station list from KV");
                return;
            }
        };

        let stations = board::station_map(tuples);
        info!(stations = stations.len(), "Loaded station list");
        *self.static_stations.write().await = stations;

        // Re-join counts so the new list shows up without waiting a cycle.
        let trains = self.store.read().await.trains.clone();
        let static_stations = self.static_stations.read().await.clone();
        let joined = board::join_station_counts(&static_stations, &trains);
        self.store.write().await.stations = joined;
    }
}
