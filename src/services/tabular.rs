// src/services/tabular.rs

//! Tabular (pure JSON) availability extraction.
//!
//! The portal answers with a schedule descriptor and a list of reserved
//! entries:
//!
//! ```json
//! {
//!   "schedule": { "startHour": 8, "hourUnit": 1.5, "slotCount": 10 },
//!   "reservedList": [ { "courtSeq": "31", "beginTime": "8" } ]
//! }
//! ```
//!
//! Courts come from the facility roster; a slot is free unless the key
//! `"{sequence_id},{start}"` appears in the reserved set.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{CourtAvailability, Facility, SlotTime, TimeSlot};
use crate::services::json::{field, field_f64, field_string};

/// Upper bound on slots in one day's grid (half-hour slots around the clock).
const MAX_SLOTS_PER_DAY: f64 = 48.0;

/// Slot grid of one facility for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleDescriptor {
    pub start_hour: f64,
    pub hour_unit: f64,
    pub slot_count: usize,
}

impl ScheduleDescriptor {
    /// Read the descriptor; `None` when a field is missing or unusable.
    pub fn from_json(root: &Value) -> Option<Self> {
        let schedule = field(root, &["schedule", "timeInfo", "resultData"]).unwrap_or(root);
        let start_hour = field_f64(schedule, &["start_hour", "startHour"])?;
        let hour_unit = field_f64(schedule, &["hour_unit", "hourUnit"])?;
        let slot_count = field_f64(schedule, &["slot_count", "slotCount", "count"])?;
        if ![start_hour, hour_unit, slot_count].iter().all(|v| v.is_finite()) {
            return None;
        }
        if hour_unit <= 0.0
            || !(0.0..=MAX_SLOTS_PER_DAY).contains(&slot_count)
            || !(0.0..24.0).contains(&start_hour)
        {
            return None;
        }
        Some(Self {
            start_hour,
            hour_unit,
            slot_count: slot_count as usize,
        })
    }

    /// `(start, end)` of every slot. The accumulator keeps its fraction;
    /// only the rendered times are floored to the whole hour.
    pub fn intervals(&self) -> Vec<(SlotTime, SlotTime)> {
        let mut hour = self.start_hour;
        let mut out = Vec::new();
        for _ in 0..self.slot_count {
            let next = hour + self.hour_unit;
            out.push((
                SlotTime::from_fractional_hour(hour),
                SlotTime::from_fractional_hour(next),
            ));
            hour = next;
        }
        out
    }
}

/// Normalize a reserved begin-time: `"8"` becomes `"08:00"`, anything else
/// is used as given.
pub fn normalize_begin_time(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(hour) => SlotTime::at_hour(hour).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Composite key matching a court sequence id with a slot start.
pub fn reserved_key(sequence_id: &str, start: &str) -> String {
    format!("{sequence_id},{start}")
}

/// Build the reserved key set, skipping entries without a court or time.
pub fn reserved_keys(root: &Value) -> HashSet<String> {
    let Some(entries) = field(root, &["reserved", "reservedList", "reserveList"])
        .and_then(Value::as_array)
    else {
        return HashSet::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let seq = field_string(entry, &["court_seq", "courtSeq", "court_sequence_id"])?;
            let begin = field_string(entry, &["begin_time", "beginTime"])?;
            Some(reserved_key(seq.trim(), &normalize_begin_time(&begin)))
        })
        .collect()
}

/// Extract per-court availability from a parsed tabular response.
pub fn extract(root: &Value, facility: &Facility, date: NaiveDate) -> Vec<CourtAvailability> {
    let reserved = reserved_keys(root);
    let intervals = match ScheduleDescriptor::from_json(root) {
        Some(schedule) => schedule.intervals(),
        None => {
            log::warn!(
                "{} {}: schedule descriptor missing or malformed",
                facility.id,
                date
            );
            Vec::new()
        }
    };

    facility
        .courts
        .iter()
        .map(|court| {
            let label = facility.court_label(court);
            let slots = intervals
                .iter()
                .map(|(start, end)| TimeSlot {
                    facility_id: facility.id.clone(),
                    court_label: label.clone(),
                    date,
                    start: *start,
                    end: *end,
                    available: !reserved
                        .contains(&reserved_key(&court.sequence_id, &start.to_string())),
                })
                .collect();
            CourtAvailability::from_slots(label, court.sequence_id.clone(), slots)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Court;
    use serde_json::json;

    fn facility() -> Facility {
        Facility {
            id: "FAC01".into(),
            name: "Riverside Tennis Center".into(),
            label_prefix: "Outdoor ".into(),
            courts: vec![Court::new("1", "31")],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn times(court: &CourtAvailability) -> Vec<(String, String, bool)> {
        court
            .slots
            .iter()
            .map(|s| (s.start.to_string(), s.end.to_string(), s.available))
            .collect()
    }

    #[test]
    fn empty_reserved_set_is_all_available() {
        let body = json!({
            "schedule": { "start_hour": 8, "hour_unit": 1, "slot_count": 2 },
            "reserved": []
        });
        let courts = extract(&body, &facility(), date());
        assert_eq!(courts.len(), 1);
        assert_eq!(
            times(&courts[0]),
            vec![
                ("08:00".into(), "09:00".into(), true),
                ("09:00".into(), "10:00".into(), true),
            ]
        );
        assert_eq!(courts[0].court_label, "Outdoor 1");
    }

    #[test]
    fn reserved_key_marks_slot_taken() {
        let body = json!({
            "schedule": { "startHour": 8, "hourUnit": 1, "slotCount": 2 },
            "reservedList": [ { "courtSeq": "31", "beginTime": "08:00" } ]
        });
        let courts = extract(&body, &facility(), date());
        assert_eq!(
            times(&courts[0]),
            vec![
                ("08:00".into(), "09:00".into(), false),
                ("09:00".into(), "10:00".into(), true),
            ]
        );
        assert_eq!(courts[0].available_count, 1);
    }

    #[test]
    fn bare_integer_begin_time_is_normalized() {
        assert_eq!(normalize_begin_time("8"), "08:00");
        assert_eq!(normalize_begin_time("14"), "14:00");
        assert_eq!(normalize_begin_time("09:30"), "09:30");

        let body = json!({
            "schedule": { "startHour": "9", "hourUnit": "1", "slotCount": "1" },
            "reservedList": [ { "courtSeq": 31, "beginTime": 9 } ]
        });
        let courts = extract(&body, &facility(), date());
        assert!(!courts[0].slots[0].available);
    }

    #[test]
    fn availability_is_negated_membership() {
        let mut fac = facility();
        fac.courts.push(Court::new("2", "32"));
        let body = json!({
            "schedule": { "startHour": 6, "hourUnit": 2, "slotCount": 6 },
            "reservedList": [
                { "courtSeq": "31", "beginTime": "10" },
                { "courtSeq": "32", "beginTime": "06:00" },
                { "courtSeq": "32", "beginTime": "16" }
            ]
        });
        let reserved = reserved_keys(&body);
        for court in extract(&body, &fac, date()) {
            for slot in &court.slots {
                let key = reserved_key(&court.court_id, &slot.start.to_string());
                assert_eq!(slot.available, !reserved.contains(&key));
            }
        }
    }

    #[test]
    fn fractional_unit_keeps_accumulator() {
        let schedule = ScheduleDescriptor {
            start_hour: 8.0,
            hour_unit: 1.5,
            slot_count: 4,
        };
        let labels: Vec<_> = schedule
            .intervals()
            .iter()
            .map(|(s, e)| format!("{s}-{e}"))
            .collect();
        // 8.0, 9.5, 11.0, 12.5 -> floored labels, accumulator not rounded
        assert_eq!(
            labels,
            vec!["08:00-09:00", "09:00-11:00", "11:00-12:00", "12:00-14:00"]
        );
    }

    #[test]
    fn missing_schedule_yields_empty_slot_lists() {
        let body = json!({ "reservedList": [] });
        let courts = extract(&body, &facility(), date());
        assert_eq!(courts.len(), 1);
        assert!(courts[0].slots.is_empty());
        assert!(!courts[0].has_availability);
    }

    #[test]
    fn malformed_reserved_entries_are_skipped() {
        let body = json!({
            "schedule": { "startHour": 8, "hourUnit": 1, "slotCount": 1 },
            "reservedList": [ { "courtSeq": "31" }, "garbage", { "beginTime": "8" } ]
        });
        let courts = extract(&body, &facility(), date());
        assert!(courts[0].slots[0].available);
    }

    #[test]
    fn rejects_huge_or_non_finite_descriptor() {
        let huge = json!({ "schedule": { "startHour": 8, "hourUnit": 1, "slotCount": 1e300 } });
        assert!(ScheduleDescriptor::from_json(&huge).is_none());

        let nan = json!({ "schedule": { "startHour": 8, "hourUnit": "NaN", "slotCount": 2 } });
        assert!(ScheduleDescriptor::from_json(&nan).is_none());

        let inf = json!({ "schedule": { "startHour": "inf", "hourUnit": 1, "slotCount": 2 } });
        assert!(ScheduleDescriptor::from_json(&inf).is_none());

        let too_many = json!({ "schedule": { "startHour": 8, "hourUnit": 1, "slotCount": 49 } });
        assert!(ScheduleDescriptor::from_json(&too_many).is_none());
    }

    #[test]
    fn huge_slot_count_degrades_to_empty_courts() {
        let body = json!({
            "schedule": { "startHour": 8, "hourUnit": 1, "slotCount": 1e300 },
            "reservedList": []
        });
        let courts = extract(&body, &facility(), date());
        assert_eq!(courts.len(), 1);
        assert!(courts[0].slots.is_empty());
    }

    #[test]
    fn rejects_non_positive_unit() {
        let body = json!({ "schedule": { "startHour": 8, "hourUnit": 0, "slotCount": 3 } });
        assert!(ScheduleDescriptor::from_json(&body).is_none());
    }
}
