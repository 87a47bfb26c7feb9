//! Local filesystem storage implementation.
//!
//! Writes each file atomically (temp file, then rename) under a root
//! directory that is created on first write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::DailyResult;
use crate::pipeline::Table;
use crate::storage::csv::to_csv;
use crate::storage::{ResultStorage, WriteSummary};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn results_key(tag: &str) -> String {
        format!("availability_{tag}.json")
    }

    fn full_key(tag: &str) -> String {
        format!("availability_{tag}.csv")
    }

    fn available_key(tag: &str) -> String {
        format!("available_{tag}.csv")
    }
}

#[async_trait]
impl ResultStorage for LocalStorage {
    async fn write_results(
        &self,
        tag: &str,
        results: &[DailyResult],
        full: &Table,
        available: &Table,
    ) -> Result<WriteSummary> {
        let results_path = self.write_json(&Self::results_key(tag), results).await?;
        log::info!(
            "Results: {} entries written to {}",
            results.len(),
            results_path.display()
        );

        let full_path = self
            .write_bytes(&Self::full_key(tag), to_csv(full).as_bytes())
            .await?;
        log::info!(
            "Full table: {} rows written to {}",
            full.rows.len(),
            full_path.display()
        );

        let available_path = self
            .write_bytes(&Self::available_key(tag), to_csv(available).as_bytes())
            .await?;
        log::info!(
            "Available slots: {} rows written to {}",
            available.rows.len(),
            available_path.display()
        );

        Ok(WriteSummary {
            results_location: results_path.display().to_string(),
            full_location: full_path.display().to_string(),
            available_location: available_path.display().to_string(),
            result_count: results.len(),
            available_rows: available.rows.len(),
            timestamp: Utc::now(),
        })
    }

    async fn load_results(&self, tag: &str) -> Result<Vec<DailyResult>> {
        match self.read_json(&Self::results_key(tag)).await? {
            Some(results) => Ok(results),
            None => {
                log::warn!("No results found for {}", tag);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourtAvailability, OutputConfig, SlotTime, TimeSlot};
    use crate::pipeline::export::{availability_table, collect_rows, full_table};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_results() -> Vec<DailyResult> {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let slots = vec![
            TimeSlot {
                facility_id: "FAC01".into(),
                court_label: "Outdoor 1".into(),
                date,
                start: SlotTime::at_hour(8),
                end: SlotTime::at_hour(9),
                available: true,
            },
            TimeSlot {
                facility_id: "FAC01".into(),
                court_label: "Outdoor 1".into(),
                date,
                start: SlotTime::at_hour(9),
                end: SlotTime::at_hour(10),
                available: false,
            },
        ];
        vec![
            DailyResult::success(
                date,
                "FAC01",
                "Riverside",
                vec![CourtAvailability::from_slots("Outdoor 1", "31", slots)],
            ),
            DailyResult::error(date.succ_opt().unwrap(), "FAC01", "Riverside", "HTTP 502"),
        ]
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
        assert!(storage.load_results("2026-03-01_2026-03-02").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_creates_missing_output_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested/output"));
        storage.write_bytes("a.csv", b"x").await.unwrap();
        assert!(tmp.path().join("nested/output/a.csv").exists());
    }

    #[tokio::test]
    async fn test_write_results_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let results = sample_results();
        let rows = collect_rows(&results);
        let full = full_table(&rows, &OutputConfig::default());
        let available = availability_table(&rows);

        let tag = "2026-03-01_2026-03-02";
        let summary = storage
            .write_results(tag, &results, &full, &available)
            .await
            .unwrap();
        assert_eq!(summary.result_count, 2);
        assert_eq!(summary.available_rows, 1);

        let loaded = storage.load_results(tag).await.unwrap();
        assert_eq!(loaded, results);

        let full_csv = std::fs::read_to_string(tmp.path().join("availability_2026-03-01_2026-03-02.csv")).unwrap();
        assert_eq!(
            full_csv,
            "date,court,start_time,end_time,status\n\
             2026-03-01,Riverside Outdoor 1,08:00,09:00,Available\n\
             2026-03-01,Riverside Outdoor 1,09:00,10:00,Unavailable\n"
        );

        let open_csv = std::fs::read_to_string(tmp.path().join("available_2026-03-01_2026-03-02.csv")).unwrap();
        assert_eq!(
            open_csv,
            "date,court,start_time,end_time\n2026-03-01,Riverside Outdoor 1,08:00,09:00\n"
        );
    }
}
