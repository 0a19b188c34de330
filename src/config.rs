use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Upstream real-time feed: one JSON document covering the whole network.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    /// Shared cache freshness window for the feed proxy, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// SQLite database holding the kv table.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// KV key under which this network's station list is stored.
    #[serde(default = "default_rail_network")]
    pub rail_network: String,
    /// Optional JSON file of station tuples loaded into KV at startup.
    #[serde(default)]
    pub stations_seed: Option<String>,
    /// User settings blob on disk.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Optional directory of built frontend assets served at the root.
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_upstream_url() -> String {
    "https://tsimobile.viarail.ca/data/allData.json".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_database_url() -> String {
    "sqlite:database/data.db?mode=rwc".to_string()
}

fn default_rail_network() -> String {
    "VIA Rail".to_string()
}

fn default_settings_path() -> String {
    "settings.json".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mapping_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(
            config.upstream_url,
            "https://tsimobile.viarail.ca/data/allData.json"
        );
        assert_eq!(config.cache_ttl_seconds, 30);
        assert_eq!(config.rail_network, "VIA Rail");
        assert!(config.stations_seed.is_none());
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_permissive);
    }

    #[test]
    fn overrides_apply() {
        let config: Config = serde_yaml::from_str(
            "bind_addr: \"127.0.0.1:8080\"\ncache_ttl_seconds: 10\ncors_permissive: true\n",
        )
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.cache_ttl_seconds, 10);
        assert!(config.cors_permissive);
    }
}
