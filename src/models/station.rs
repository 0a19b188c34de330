use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `[lat, lng]` pair, in the map's coordinate order.
pub type MapCoord = [f64; 2];

/// Min/max corner pair enclosing a set of coordinates.
pub type MapBounds = [MapCoord; 2];

/// `[code, name, [lat, lng]]` tuple as stored in the KV station list.
pub type StationTuple = (String, String, MapCoord);

/// One physical station, keyed by code in the board's station map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Station {
    pub name: String,
    /// Static coordinates from the KV list. Placeholder records created for
    /// codes missing from that list carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<f64>>)]
    pub coords: Option<MapCoord>,
    /// Number of (train, stop) pairs referencing this station in the current
    /// feed. Absent until the first reference is counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}
