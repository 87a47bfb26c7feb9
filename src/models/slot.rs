// src/models/slot.rs

//! Time slot, per-court and per-day availability structures.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Canonical wall-clock start or end of a slot, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime {
    hour: u32,
    minute: u32,
}

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Whole-hour time, e.g. `SlotTime::at_hour(8)` is `08:00`.
    pub fn at_hour(hour: u32) -> Self {
        Self::new(hour, 0)
    }

    /// Render a fractional hour accumulator. Only the whole-hour part is kept.
    pub fn from_fractional_hour(hour: f64) -> Self {
        Self::at_hour(hour.max(0.0).floor() as u32)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Same minute, `hours` later.
    pub fn plus_hours(&self, hours: u32) -> Self {
        Self::new(self.hour + hours, self.minute)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for SlotTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AppError::validation(format!("time '{s}' is not HH:MM")))?;
        let hour = h
            .parse::<u32>()
            .map_err(|_| AppError::validation(format!("bad hour in '{s}'")))?;
        let minute = m
            .parse::<u32>()
            .map_err(|_| AppError::validation(format!("bad minute in '{s}'")))?;
        if minute > 59 {
            return Err(AppError::validation(format!("bad minute in '{s}'")));
        }
        Ok(Self::new(hour, minute))
    }
}

impl TryFrom<String> for SlotTime {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

/// A bookable interval on one court of one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub facility_id: String,
    pub court_label: String,
    pub date: NaiveDate,
    pub start: SlotTime,
    pub end: SlotTime,
    pub available: bool,
}

/// All slots of one court on one day, with derived counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtAvailability {
    /// Display label, already prefixed for the facility
    pub court_label: String,

    /// Upstream identifier (sequence id or court code)
    pub court_id: String,

    pub slots: Vec<TimeSlot>,
    pub available_count: usize,
    pub total_count: usize,
    pub has_availability: bool,
}

impl CourtAvailability {
    /// Build from slots, ordering them by start and deriving the counts.
    pub fn from_slots(
        court_label: impl Into<String>,
        court_id: impl Into<String>,
        mut slots: Vec<TimeSlot>,
    ) -> Self {
        slots.sort_by(|a, b| a.start.cmp(&b.start));
        let available_count = slots.iter().filter(|s| s.available).count();
        Self {
            court_label: court_label.into(),
            court_id: court_id.into(),
            total_count: slots.len(),
            has_availability: available_count > 0,
            available_count,
            slots,
        }
    }
}

/// Outcome of one `(date, facility)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyStatus {
    Success,
    Error,
}

/// Per-day, per-facility result. An error result is a "skipped" marker, not
/// a day without free courts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyResult {
    pub date: NaiveDate,
    pub facility_id: String,
    pub facility_name: String,
    pub status: DailyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub courts: Vec<CourtAvailability>,
    pub available_total: usize,
    pub slot_total: usize,
}

impl DailyResult {
    pub fn success(
        date: NaiveDate,
        facility_id: impl Into<String>,
        facility_name: impl Into<String>,
        courts: Vec<CourtAvailability>,
    ) -> Self {
        let available_total = courts.iter().map(|c| c.available_count).sum();
        let slot_total = courts.iter().map(|c| c.total_count).sum();
        Self {
            date,
            facility_id: facility_id.into(),
            facility_name: facility_name.into(),
            status: DailyStatus::Success,
            error: None,
            courts,
            available_total,
            slot_total,
        }
    }

    pub fn error(
        date: NaiveDate,
        facility_id: impl Into<String>,
        facility_name: impl Into<String>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            date,
            facility_id: facility_id.into(),
            facility_name: facility_name.into(),
            status: DailyStatus::Error,
            error: Some(error.to_string()),
            courts: Vec::new(),
            available_total: 0,
            slot_total: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DailyStatus::Success
    }

    /// True only for a successful day on which some court has a free slot.
    pub fn has_availability(&self) -> bool {
        self.is_success() && self.courts.iter().any(|c| c.has_availability)
    }

    pub fn slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.courts.iter().flat_map(|c| c.slots.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn slot(start: u32, available: bool) -> TimeSlot {
        TimeSlot {
            facility_id: "FAC01".into(),
            court_label: "Court 1".into(),
            date: date(),
            start: SlotTime::at_hour(start),
            end: SlotTime::at_hour(start + 1),
            available,
        }
    }

    #[test]
    fn slot_time_renders_zero_padded() {
        assert_eq!(SlotTime::at_hour(8).to_string(), "08:00");
        assert_eq!(SlotTime::new(13, 30).to_string(), "13:30");
    }

    #[test]
    fn slot_time_parses_and_rejects() {
        assert_eq!("09:00".parse::<SlotTime>().unwrap(), SlotTime::at_hour(9));
        assert!("9".parse::<SlotTime>().is_err());
        assert!("09:75".parse::<SlotTime>().is_err());
    }

    #[test]
    fn fractional_hour_floors_label_only() {
        assert_eq!(SlotTime::from_fractional_hour(9.5).to_string(), "09:00");
        assert_eq!(SlotTime::from_fractional_hour(11.0).to_string(), "11:00");
    }

    #[test]
    fn slot_time_serializes_as_string() {
        let json = serde_json::to_string(&SlotTime::at_hour(7)).unwrap();
        assert_eq!(json, "\"07:00\"");
    }

    #[test]
    fn court_counts_are_derived() {
        let court = CourtAvailability::from_slots(
            "Court 1",
            "31",
            vec![slot(10, false), slot(8, true), slot(9, true)],
        );
        assert_eq!(court.total_count, 3);
        assert_eq!(court.available_count, 2);
        assert!(court.has_availability);
        assert_eq!(court.slots[0].start, SlotTime::at_hour(8));
    }

    #[test]
    fn error_result_is_not_zero_availability() {
        let failed = DailyResult::error(date(), "FAC01", "Riverside", "HTTP 503");
        assert!(!failed.is_success());
        assert!(failed.courts.is_empty());
        assert_eq!(failed.error.as_deref(), Some("HTTP 503"));

        let empty_day = DailyResult::success(date(), "FAC01", "Riverside", Vec::new());
        assert!(empty_day.is_success());
        assert_ne!(failed.status, empty_day.status);
    }

    #[test]
    fn daily_totals_sum_courts() {
        let courts = vec![
            CourtAvailability::from_slots("Court 1", "31", vec![slot(8, true), slot(9, false)]),
            CourtAvailability::from_slots("Court 2", "32", vec![slot(8, true)]),
        ];
        let day = DailyResult::success(date(), "FAC01", "Riverside", courts);
        assert_eq!(day.available_total, 2);
        assert_eq!(day.slot_total, 3);
        assert!(day.has_availability());
        assert_eq!(day.slots().count(), 3);
    }
}
