//! Storage abstractions for crawl result persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── availability_2026-03-01_2026-03-31.json   # every DailyResult
//! ├── availability_2026-03-01_2026-03-31.csv    # full view with status
//! └── available_2026-03-01_2026-03-31.csv       # bookable slots only
//! ```

pub mod csv;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::DailyResult;
use crate::pipeline::Table;

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Where the JSON results went
    pub results_location: String,
    /// Where the full CSV went
    pub full_location: String,
    /// Where the availability-only CSV went
    pub available_location: String,
    /// Number of DailyResult entries written
    pub result_count: usize,
    /// Number of rows in the availability-only view
    pub available_rows: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for result storage backends.
#[async_trait]
pub trait ResultStorage: Send + Sync {
    /// Persist the raw results and both export views under `tag`.
    async fn write_results(
        &self,
        tag: &str,
        results: &[DailyResult],
        full: &Table,
        available: &Table,
    ) -> Result<WriteSummary>;

    /// Load previously written results for `tag`.
    async fn load_results(&self, tag: &str) -> Result<Vec<DailyResult>>;
}
