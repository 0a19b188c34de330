use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::models::TrainStatus;

/// Durations the auto-refresh menu offers, in seconds.
pub const REFRESH_INTERVALS: [u64; 6] = [15, 30, 45, 60, 120, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// User preferences, persisted as a single JSON blob. Field names on the
/// wire match the original browser-local settings format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub show_map: bool,
    pub filter_map: bool,
    pub train_list_status: TrainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    pub show_previous_stations: bool,
    pub show_previous_trains: bool,
    pub show_inactive_trains: bool,
    pub zoom_level: u8,
    pub auto_refresh: bool,
    /// Auto-refresh period in seconds; one of [`REFRESH_INTERVALS`].
    pub refresh_interval: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            show_map: true,
            filter_map: true,
            train_list_status: TrainStatus::Departed,
            theme: None,
            show_previous_stations: false,
            show_previous_trains: false,
            show_inactive_trains: false,
            zoom_level: 10,
            auto_refresh: true,
            refresh_interval: 45,
        }
    }
}

impl UserSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !REFRESH_INTERVALS.contains(&self.refresh_interval) {
            return Err(SettingsError::InvalidInterval(self.refresh_interval));
        }
        Ok(())
    }
}

/// On-disk home of the settings blob: deserialized once at startup, written
/// on every change.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored blob. Missing file or corrupt data falls back to
    /// defaults (fields absent from the blob take their default values via
    /// serde).
    pub fn load(&self) -> UserSettings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return UserSettings::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings, using defaults");
                return UserSettings::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored settings are corrupt, using defaults");
                UserSettings::default()
            }
        }
    }

    /// Persist the blob. Called on every settings change.
    pub fn save(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::SerializeError(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| SettingsError::WriteError(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unsupported refresh interval: {0} (expected one of 15, 30, 45, 60, 120, 300)")]
    InvalidInterval(u64),
    #[error("Failed to serialize settings: {0}")]
    SerializeError(String),
    #[error("Failed to write settings file: {0}")]
    WriteError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> SettingsStore {
        SettingsStore::new(std::env::temp_dir().join(format!("viatrack-{}.json", name)))
    }

    #[test]
    fn defaults_match_the_shipped_preferences() {
        let settings = UserSettings::default();
        assert!(settings.show_map);
        assert!(settings.filter_map);
        assert_eq!(settings.train_list_status, TrainStatus::Departed);
        assert_eq!(settings.theme, None);
        assert!(!settings.show_previous_stations);
        assert_eq!(settings.zoom_level, 10);
        assert!(settings.auto_refresh);
        assert_eq!(settings.refresh_interval, 45);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let store = store("round-trip");
        let settings = UserSettings {
            show_map: false,
            theme: Some(Theme::Dark),
            zoom_level: 7,
            auto_refresh: false,
            refresh_interval: 120,
            ..UserSettings::default()
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);

        let _ = std::fs::remove_file(&store.path);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = store("does-not-exist");
        let _ = std::fs::remove_file(&store.path);
        assert_eq!(store.load(), UserSettings::default());
    }

    #[test]
    fn corrupt_blob_yields_defaults() {
        let store = store("corrupt");
        std::fs::write(&store.path, "{not valid json").unwrap();
        assert_eq!(store.load(), UserSettings::default());
        let _ = std::fs::remove_file(&store.path);
    }

    #[test]
    fn absent_fields_fall_back_to_defaults() {
        let store = store("partial");
        std::fs::write(&store.path, r#"{"zoomLevel": 5, "autoRefresh": false}"#).unwrap();

        let settings = store.load();
        assert_eq!(settings.zoom_level, 5);
        assert!(!settings.auto_refresh);
        // everything else keeps its default
        assert_eq!(settings.refresh_interval, 45);
        assert_eq!(settings.train_list_status, TrainStatus::Departed);
        assert!(settings.show_map);

        let _ = std::fs::remove_file(&store.path);
    }

    #[test]
    fn interval_outside_the_menu_is_rejected() {
        let settings = UserSettings {
            refresh_interval: 20,
            ..UserSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidInterval(20))
        ));

        for interval in REFRESH_INTERVALS {
            let settings = UserSettings {
                refresh_interval: interval,
                ..UserSettings::default()
            };
            assert!(settings.validate().is_ok());
        }
    }
}
