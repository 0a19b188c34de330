use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid JSON under key '{key}': {message}")]
    InvalidJson { key: String, message: String },
    #[error("Failed to read seed file: {0}")]
    SeedError(String),
}

/// Key-value lookup over the `kv` table. The station list lives under a
/// single fixed key per rail network; nothing writes at runtime.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch one key and parse its value as JSON. `Ok(None)` when the key is
    /// absent.
    pub async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, KvError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KvError::DatabaseError(e.to_string()))?;

        match value {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                KvError::InvalidJson {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            }),
            None => Ok(None),
        }
    }

    /// Load a JSON file into the store under `key`, replacing any existing
    /// value. Used at startup to seed the station list.
    pub async fn seed_from_file(&self, key: &str, path: &str) -> Result<(), KvError> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| KvError::SeedError(e.to_string()))?;

        // The endpoint serves this verbatim, so reject malformed input here.
        let _: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| KvError::SeedError(format!("{}: {}", path, e)))?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(&raw)
        .execute(&self.pool)
        .await
        .map_err(|e| KvError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_is_none() {
        let kv = KvStore::new(test_pool().await);
        assert!(kv.get_json("VIA Rail").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_value_round_trips_as_json() {
        let kv = KvStore::new(test_pool().await);
        sqlx::query("INSERT INTO kv (key, value) VALUES (?, ?)")
            .bind("VIA Rail")
            .bind(r#"[["TRTO", "Toronto", [43.6, -79.3]]]"#)
            .execute(&kv.pool)
            .await
            .unwrap();

        let value = kv.get_json("VIA Rail").await.unwrap().unwrap();
        assert_eq!(value[0][0], "TRTO");
        assert_eq!(value[0][2][1], -79.3);
    }

    #[tokio::test]
    async fn malformed_value_is_an_error() {
        let kv = KvStore::new(test_pool().await);
        sqlx::query("INSERT INTO kv (key, value) VALUES (?, ?)")
            .bind("VIA Rail")
            .bind("not json")
            .execute(&kv.pool)
            .await
            .unwrap();

        assert!(matches!(
            kv.get_json("VIA Rail").await,
            Err(KvError::InvalidJson { .. })
        ));
    }

    #[tokio::test]
    async fn seed_replaces_existing_value() {
        let kv = KvStore::new(test_pool().await);
        let path = std::env::temp_dir().join("viatrack-seed-test.json");
        std::fs::write(&path, r#"[["OTTW", "Ottawa", [45.4, -75.6]]]"#).unwrap();

        kv.seed_from_file("VIA Rail", path.to_str().unwrap())
            .await
            .unwrap();
        let value = kv.get_json("VIA Rail").await.unwrap().unwrap();
        assert_eq!(value[0][0], "OTTW");

        std::fs::write(&path, r#"[["QBEC", "Québec", [46.8, -71.2]]]"#).unwrap();
        kv.seed_from_file("VIA Rail", path.to_str().unwrap())
            .await
            .unwrap();
        let value = kv.get_json("VIA Rail").await.unwrap().unwrap();
        assert_eq!(value[0][0], "QBEC");

        let _ = std::fs::remove_file(&path);
    }
}
