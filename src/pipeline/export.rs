// src/pipeline/export.rs

//! Result aggregation into exportable tables.
//!
//! Pure functions over finished `DailyResult`s; no I/O happens here.

use serde::Serialize;

use crate::models::{DailyResult, OutputConfig};

/// Header of the full view.
pub const FULL_HEADER: [&str; 5] = ["date", "court", "start_time", "end_time", "status"];

/// Header of the availability-only view.
pub const AVAILABLE_HEADER: [&str; 4] = ["date", "court", "start_time", "end_time"];

/// One slot flattened for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub date: String,
    pub facility_name: String,
    pub court_label: String,
    pub start_time: String,
    pub end_time: String,
    pub available: bool,
}

impl ExportRow {
    /// `"{facility_display_name} {court_label}"`.
    pub fn court(&self) -> String {
        format!("{} {}", self.facility_name, self.court_label)
    }
}

/// Header plus string cells, ready for a CSV writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Flatten successful results into rows in canonical order.
///
/// Error results contribute no rows; they are reported separately.
pub fn collect_rows(results: &[DailyResult]) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = results
        .iter()
        .filter(|r| r.is_success())
        .flat_map(|r| {
            r.slots().map(move |slot| ExportRow {
                date: r.date.format("%Y-%m-%d").to_string(),
                facility_name: r.facility_name.clone(),
                court_label: slot.court_label.clone(),
                start_time: slot.start.to_string(),
                end_time: slot.end.to_string(),
                available: slot.available,
            })
        })
        .collect();
    sort_rows(&mut rows);
    rows
}

/// Stable sort by date, facility name, court label, then start time.
pub fn sort_rows(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.facility_name.cmp(&b.facility_name))
            .then_with(|| a.court_label.cmp(&b.court_label))
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

/// Every slot, with a status column.
pub fn full_table(rows: &[ExportRow], output: &OutputConfig) -> Table {
    Table {
        header: FULL_HEADER.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| {
                let status = if row.available {
                    &output.available_label
                } else {
                    &output.unavailable_label
                };
                vec![
                    row.date.clone(),
                    row.court(),
                    row.start_time.clone(),
                    row.end_time.clone(),
                    status.clone(),
                ]
            })
            .collect(),
    }
}

/// Bookable slots only, without a status column.
pub fn availability_table(rows: &[ExportRow]) -> Table {
    Table {
        header: AVAILABLE_HEADER.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .filter(|row| row.available)
            .map(|row| {
                vec![
                    row.date.clone(),
                    row.court(),
                    row.start_time.clone(),
                    row.end_time.clone(),
                ]
            })
            .collect(),
    }
}

/// Dates/facilities that were skipped, as `(date, facility_id, error)`.
pub fn failed_pairs(results: &[DailyResult]) -> Vec<(String, String, String)> {
    results
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| {
            (
                r.date.to_string(),
                r.facility_id.clone(),
                r.error.clone().unwrap_or_default(),
            )
        })
        .collect()
}
