//! Snapshot Persistence Module
//!
//! Stores the one cached rate as a small JSON record that is overwritten on
//! every successful fetch:
//!
//! ```json
//! {"price": 1520.5, "time": "2024-05-01 12:00:00"}
//! ```
//!
//! Loading is best-effort: a missing, truncated or otherwise corrupt record is
//! reported as "no cached value" instead of an error.

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::PriceSnapshot;

/// Timestamp layout of the `time` field (UTC)
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Refusing to store invalid price {0}")]
    InvalidPrice(f64),
}

/// On-disk record layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PriceRecord {
    price: f64,
    time: String,
}

impl From<&PriceSnapshot> for PriceRecord {
    fn from(snapshot: &PriceSnapshot) -> Self {
        Self {
            price: snapshot.price,
            time: snapshot.captured_at.format(TIME_FORMAT).to_string(),
        }
    }
}

impl PriceRecord {
    fn into_snapshot(self) -> Option<PriceSnapshot> {
        let naive = NaiveDateTime::parse_from_str(&self.time, TIME_FORMAT).ok()?;
        if !PriceSnapshot::is_valid_price(self.price) {
            return None;
        }
        Some(PriceSnapshot::at(self.price, Utc.from_utc_datetime(&naive)))
    }
}

/// Single-record store for the cached rate
#[derive(Debug, Clone)]
pub struct PriceStore {
    path: PathBuf,
}

impl PriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the stored record with `snapshot`.
    ///
    /// The record is written to a sibling `.tmp` file and renamed into place,
    /// so readers never observe a half-written file.
    pub async fn save(&self, snapshot: &PriceSnapshot) -> Result<(), StorageError> {
        if !PriceSnapshot::is_valid_price(snapshot.price) {
            return Err(StorageError::InvalidPrice(snapshot.price));
        }

        let json = serde_json::to_string(&PriceRecord::from(snapshot))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| io_error(&self.path, source))?;

        debug!(
            path = %self.path.display(),
            price = snapshot.price,
            "💾 Rate snapshot saved"
        );
        Ok(())
    }

    /// Read the stored record; `None` when absent or unusable
    pub async fn load(&self) -> Option<PriceSnapshot> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No rate snapshot stored yet");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read rate snapshot");
                return None;
            }
        };

        let record: PriceRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring malformed rate snapshot");
                return None;
            }
        };

        let snapshot = record.clone().into_snapshot();
        if snapshot.is_none() {
            warn!(
                path = %self.path.display(),
                price = record.price,
                time = %record.time,
                "Ignoring rate snapshot with invalid price or timestamp"
            );
        }
        snapshot
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use temp_dir::TempDir;

    fn temp_store() -> (TempDir, PriceStore) {
        let dir = TempDir::new().unwrap();
        let store = PriceStore::new(dir.path().join("data").join("price_data.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_load_missing_file_is_absent() {
        let (_dir, store) = temp_store();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_dir, store) = temp_store();
        let captured_at = Utc::now() - ChronoDuration::seconds(30);
        store
            .save(&PriceSnapshot::at(1500.0, captured_at))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.price, 1500.0);
        assert_eq!(
            loaded.captured_at.format(TIME_FORMAT).to_string(),
            captured_at.format(TIME_FORMAT).to_string()
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_record() {
        let (_dir, store) = temp_store();
        store.save(&PriceSnapshot::new(1500.0)).await.unwrap();
        store.save(&PriceSnapshot::new(1520.0)).await.unwrap();

        assert_eq!(store.load().await.unwrap().price, 1520.0);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_record_layout() {
        let (_dir, store) = temp_store();
        let captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store
            .save(&PriceSnapshot::at(1520.5, captured_at))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["price"], 1520.5);
        assert_eq!(value["time"], "2024-05-01 12:00:00");
    }

    #[tokio::test]
    async fn test_corrupt_records_are_absent() {
        let (_dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        for raw in [
            "not json at all",
            r#"{"price": 1500.0}"#,
            r#"{"time": "2024-05-01 12:00:00"}"#,
            r#"{"price": 1500.0, "time": "yesterday"}"#,
            r#"{"price": -1.0, "time": "2024-05-01 12:00:00"}"#,
            r#"{"price": "1500", "time": "2024-05-01 12:00:00"}"#,
        ] {
            std::fs::write(store.path(), raw).unwrap();
            assert!(store.load().await.is_none(), "accepted {raw}");
        }
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_price() {
        let (_dir, store) = temp_store();
        let result = store.save(&PriceSnapshot::new(0.0)).await;

        assert!(matches!(result, Err(StorageError::InvalidPrice(_))));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_reports_unwritable_location() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = PriceStore::new(blocker.join("price_data.json"));

        let result = store.save(&PriceSnapshot::new(1500.0)).await;

        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert!(store.load().await.is_none());
    }
}
