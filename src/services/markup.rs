// src/services/markup.rs

//! Embedded-markup availability extraction.
//!
//! The portal answers with JSON court blocks, each wrapping an HTML fragment
//! with one checkbox per slot:
//!
//! ```json
//! { "courts": [ { "courtName": "1", "courtId": "T01",
//!                 "html": "<ul><li><input type=\"checkbox\" value=\"09:00\"></li></ul>" } ] }
//! ```
//!
//! The hour shown by the portal is one ahead of the real slot start, and a
//! `06:00` control is a placeholder that cannot be booked.

use std::collections::HashSet;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CourtAvailability, Facility, SlotTime, TimeSlot};
use crate::services::json::{field, field_string};

/// A time as advertised by the portal, before the hour correction.
///
/// Only this type can be corrected, and correcting it yields a `SlotTime`,
/// so a canonical time is never shifted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedTime {
    hour: u32,
    minute: u32,
}

impl DisplayedTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Non-bookable `06:00` control.
    pub fn is_placeholder(&self) -> bool {
        self.hour == 6 && self.minute == 0
    }

    /// Canonical slot start. `None` for the placeholder; hours from 7 on
    /// move back by one.
    pub fn canonical(self) -> Option<SlotTime> {
        if self.is_placeholder() {
            return None;
        }
        let hour = if self.hour >= 7 { self.hour - 1 } else { self.hour };
        Some(SlotTime::new(hour, self.minute))
    }
}

/// Compiled selectors and patterns for slot controls.
pub struct MarkupParser {
    control: Selector,
    label: Selector,
    time: Regex,
}

impl MarkupParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            control: parse_selector(r#"input[type="checkbox"]"#)?,
            label: parse_selector("label")?,
            time: Regex::new(r"(\d{1,2}):(\d{2})")?,
        })
    }

    fn parse_time(&self, text: &str) -> Option<DisplayedTime> {
        let caps = self.time.captures(text)?;
        let hour = caps.get(1)?.as_str().parse().ok()?;
        let minute = caps.get(2)?.as_str().parse().ok()?;
        (minute < 60).then(|| DisplayedTime::new(hour, minute))
    }

    /// Time from the control's `value`, or from the label inside the nearest
    /// enclosing list item.
    fn control_time(&self, control: &ElementRef) -> Option<DisplayedTime> {
        if let Some(time) = control
            .value()
            .attr("value")
            .and_then(|v| self.parse_time(v))
        {
            return Some(time);
        }

        let item = control
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "li")?;
        item.select(&self.label)
            .find_map(|label| self.parse_time(&label.text().collect::<String>()))
    }

    /// Every slot in one court's fragment, in document order.
    pub fn slots(
        &self,
        fragment: &str,
        facility_id: &str,
        court_label: &str,
        date: NaiveDate,
    ) -> Vec<TimeSlot> {
        let document = Html::parse_fragment(fragment);
        let mut seen = HashSet::new();
        let mut slots = Vec::new();

        for control in document.select(&self.control) {
            let Some(displayed) = self.control_time(&control) else {
                log::debug!("{facility_id} {court_label} {date}: control without a time");
                continue;
            };
            let Some(start) = displayed.canonical() else {
                continue;
            };
            if !seen.insert(start) {
                continue;
            }
            slots.push(TimeSlot {
                facility_id: facility_id.to_string(),
                court_label: court_label.to_string(),
                date,
                start,
                end: start.plus_hours(1),
                available: control.value().attr("disabled").is_none(),
            });
        }
        slots
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn court_blocks(root: &Value) -> &[Value] {
    let list = match root {
        Value::Array(_) => Some(root),
        _ => field(root, &["courts", "courtList", "list", "data"]),
    };
    list.and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Extract per-court availability from a parsed embedded-markup response.
///
/// A court block without usable markup yields an empty slot list; the other
/// blocks are still parsed.
pub fn extract(
    root: &Value,
    facility: &Facility,
    date: NaiveDate,
) -> Result<Vec<CourtAvailability>> {
    let parser = MarkupParser::new()?;

    let courts = court_blocks(root)
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let name = field_string(block, &["court_name", "courtName", "name"])
                .unwrap_or_else(|| (index + 1).to_string());
            let label = facility.prefixed(&name);
            let court_id = field_string(block, &["court_id", "courtId", "id"])
                .unwrap_or_else(|| name.clone());

            let slots = match field(block, &["html", "markup", "content"]).and_then(Value::as_str)
            {
                Some(fragment) => parser.slots(fragment, &facility.id, &label, date),
                None => {
                    log::warn!("{} {}: court block '{}' has no markup", facility.id, date, name);
                    Vec::new()
                }
            };
            CourtAvailability::from_slots(label, court_id, slots)
        })
        .collect();

    Ok(courts)
}
