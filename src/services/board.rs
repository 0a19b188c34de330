//! Board derivation over the raw feed.
//!
//! Pure functions: the refresh loop hands them the latest train map and the
//! static station list, and replaces the store's snapshot with the result in
//! a single assignment. No incremental state is kept between refreshes.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{
    MapBounds, MapCoord, Station, StationTuple, StopTime, Train, ETA_ARRIVED,
};

/// Categorized view of the feed, plus the bounding box over mappable trains.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TrainBoard {
    /// Departed, not arrived, with a known position (subset of `departed`).
    pub active: HashMap<String, Train>,
    /// Departed, not arrived.
    pub departed: HashMap<String, Train>,
    pub arrived: HashMap<String, Train>,
    pub scheduled: HashMap<String, Train>,
    /// Min/max corners over active trains; absent until one is seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub bounds: Option<MapBounds>,
}

/// Index into `times` of the first stop the train has not yet reached, or -1
/// when every stop already reads "ARR" (the feed consumers' `findIndex`
/// convention, reproduced as-is).
pub fn next_stop_index(times: &[StopTime]) -> i64 {
    times
        .iter()
        .position(|stop| stop.eta != ETA_ARRIVED)
        .map(|i| i as i64)
        .unwrap_or(-1)
}

/// Partition the raw train map into board categories.
///
/// Trains underway get their `next` index written back into the map, so the
/// raw view and the categorized copies agree. Active trains additionally
/// fold their position into the bounding box. Input order is irrelevant;
/// every train lands in exactly one of scheduled, arrived, or departed.
pub fn partition(trains: &mut HashMap<String, Train>) -> TrainBoard {
    let mut board = TrainBoard::default();

    for (train_id, train) in trains.iter_mut() {
        if !train.departed {
            board.scheduled.insert(train_id.clone(), train.clone());
        } else if train.arrived {
            board.arrived.insert(train_id.clone(), train.clone());
        } else {
            train.next = Some(next_stop_index(&train.times));

            if let Some(position) = train.position() {
                board.bounds = Some(extend_bounds(board.bounds, position));
                board.active.insert(train_id.clone(), train.clone());
            }
            board.departed.insert(train_id.clone(), train.clone());
        }
    }

    board
}

fn extend_bounds(bounds: Option<MapBounds>, [lat, lng]: MapCoord) -> MapBounds {
    match bounds {
        None => [[lat, lng], [lat, lng]],
        Some([[min_lat, min_lng], [max_lat, max_lng]]) => [
            [min_lat.min(lat), min_lng.min(lng)],
            [max_lat.max(lat), max_lng.max(lng)],
        ],
    }
}

/// Bounding box over one train's full stop list, using static station
/// coordinates instead of live positions. Used when a single train is
/// selected on the map.
pub fn route_bounds(train: &Train, stations: &HashMap<String, Station>) -> Option<MapBounds> {
    let mut bounds = None;
    for stop in &train.times {
        if let Some(coords) = stations.get(&stop.code).and_then(|s| s.coords) {
            bounds = Some(extend_bounds(bounds, coords));
        }
    }
    bounds
}

/// Convert the KV station tuples into the board's station map.
pub fn station_map(tuples: Vec<StationTuple>) -> HashMap<String, Station> {
    tuples
        .into_iter()
        .map(|(code, name, coords)| {
            (
                code,
                Station {
                    name,
                    coords: Some(coords),
                    count: None,
                },
            )
        })
        .collect()
}

/// Join per-station scheduled-stop counts against the current feed.
///
/// Every (train, stop) pair increments the referenced station's count.
/// Codes missing from the static list get a placeholder record carrying
/// only the stop's station name.
pub fn join_station_counts(
    stations: &HashMap<String, Station>,
    trains: &HashMap<String, Train>,
) -> HashMap<String, Station> {
    let mut joined = stations.clone();

    for train in trains.values() {
        for stop in &train.times {
            let station = joined.entry(stop.code.clone()).or_insert_with(|| Station {
                name: stop.station.clone(),
                coords: None,
                count: None,
            });
            *station.count.get_or_insert(0) += 1;
        }
    }

    joined
}
