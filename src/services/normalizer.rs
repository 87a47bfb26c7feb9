// src/services/normalizer.rs

//! Response normalization.
//!
//! Both portal formats converge on `CourtAvailability` lists of `TimeSlot`s.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CourtAvailability, Facility, ResponseFormat};
use crate::services::{markup, tabular};

/// Turn a raw response body into per-court availability.
///
/// A body that is not JSON at all is a parse error for this date only.
/// Damaged sub-fields inside valid JSON degrade to empty slot lists.
pub fn normalize(
    format: ResponseFormat,
    facility: &Facility,
    date: NaiveDate,
    body: &str,
) -> Result<Vec<CourtAvailability>> {
    let context = format!("{} {}", facility.id, date);
    let root: Value = serde_json::from_str(body).map_err(|e| AppError::parse(&context, e))?;

    let courts = match format {
        ResponseFormat::Tabular => {
            if !root.is_object() {
                return Err(AppError::parse(&context, "expected a JSON object"));
            }
            tabular::extract(&root, facility, date)
        }
        ResponseFormat::EmbeddedMarkup => markup::extract(&root, facility, date)?,
    };

    log::debug!(
        "{}: {} courts, {} slots",
        context,
        courts.len(),
        courts.iter().map(|c| c.total_count).sum::<usize>()
    );
    Ok(courts)
}
