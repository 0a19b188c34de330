use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::station::MapCoord;

/// Sentinel the feed writes into a stop's `eta` once the train has arrived
/// at that stop.
pub const ETA_ARRIVED: &str = "ARR";

/// Scheduled/estimated pair nested under a stop's arrival or departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StopEventTimes {
    pub scheduled: String,
    pub estimated: String,
}

/// One station visit in a train's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopTime {
    /// Station display name
    pub station: String,
    /// Station code (e.g. "TRTO")
    pub code: String,
    pub estimated: String,
    pub scheduled: String,
    /// Estimated time of arrival; "ARR" once the train has arrived here.
    pub eta: String,
    /// Delay as the feed formats it
    pub diff: String,
    /// Delay in minutes (positive = late)
    pub diff_min: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<StopEventTimes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<StopEventTimes>,
}

/// Lifecycle bucket of a train, also used as the list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    Arrived,
    #[default]
    Departed,
    Scheduled,
    All,
}

/// One train instance from the live feed, keyed by an opaque identifier in
/// the feed's top-level map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub departed: bool,
    pub arrived: bool,
    /// Origin station name
    #[serde(rename = "from")]
    pub origin: String,
    /// Destination station name
    #[serde(rename = "to")]
    pub destination: String,
    /// Instance label distinguishing runs of the same train number
    pub instance: String,
    /// Station visits in route order
    pub times: Vec<StopTime>,
    /// Last reported position; trains between GPS polls may lack one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    /// Feed freshness marker for the last position poll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_min: Option<f64>,
    /// Index into `times` of the first stop not yet arrived. Computed during
    /// board derivation for trains underway; -1 when every stop already
    /// reads "ARR".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<i64>,
}

impl Train {
    /// Coarse lifecycle bucket. Never returns [`TrainStatus::All`]; that
    /// value exists only as a filter.
    pub fn status(&self) -> TrainStatus {
        if !self.departed {
            TrainStatus::Scheduled
        } else if self.arrived {
            TrainStatus::Arrived
        } else {
            TrainStatus::Departed
        }
    }

    /// A train is mappable only with both coordinates present.
    pub fn position(&self) -> Option<MapCoord> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        }
    }
}
