mod station;
mod train;

pub use station::{MapBounds, MapCoord, Station, StationTuple};
pub use train::{StopEventTimes, StopTime, Train, TrainStatus, ETA_ARRIVED};
