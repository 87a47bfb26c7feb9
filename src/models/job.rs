// src/models/job.rs

//! Crawl job definition.

use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{AppError, Result};

/// Input of one crawl run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    from: NaiveDate,
    to: NaiveDate,
    facility_ids: Vec<String>,
    inter_request_delay: Duration,
}

impl CrawlJob {
    /// Create a job over the inclusive range `[from, to]`.
    pub fn new(
        from: NaiveDate,
        to: NaiveDate,
        facility_ids: Vec<String>,
        inter_request_delay: Duration,
    ) -> Result<Self> {
        if from > to {
            return Err(AppError::validation(format!(
                "date range is reversed: {from} > {to}"
            )));
        }
        if facility_ids.is_empty() {
            return Err(AppError::validation("no facilities selected"));
        }
        Ok(Self {
            from,
            to,
            facility_ids,
            inter_request_delay,
        })
    }

    /// Job covering the first to the last calendar day of `year`-`month`.
    pub fn for_month(
        year: i32,
        month: u32,
        facility_ids: Vec<String>,
        inter_request_delay: Duration,
    ) -> Result<Self> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::validation(format!("invalid month {year}-{month:02}")))?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| AppError::validation(format!("invalid month {year}-{month:02}")))?;
        let to = next_month
            .pred_opt()
            .ok_or_else(|| AppError::validation(format!("invalid month {year}-{month:02}")))?;
        Self::new(from, to, facility_ids, inter_request_delay)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn facility_ids(&self) -> &[String] {
        &self.facility_ids
    }

    pub fn inter_request_delay(&self) -> Duration {
        self.inter_request_delay
    }

    /// Every calendar day in the range, both endpoints included.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(move |d| *d <= self.to)
    }

    pub fn day_count(&self) -> usize {
        (self.to - self.from).num_days() as usize + 1
    }

    /// Number of `(date, facility)` pairs the run will visit.
    pub fn pair_count(&self) -> usize {
        self.day_count() * self.facility_ids.len()
    }

    /// `YYYY-MM-DD_YYYY-MM-DD`, used to name output files.
    pub fn range_tag(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn dates_include_both_endpoints() {
        let job = CrawlJob::new(d(2026, 2, 27), d(2026, 3, 2), vec!["A".into()], Duration::ZERO)
            .unwrap();
        let dates: Vec<_> = job.dates().collect();
        assert_eq!(
            dates,
            vec![d(2026, 2, 27), d(2026, 2, 28), d(2026, 3, 1), d(2026, 3, 2)]
        );
        assert_eq!(job.day_count(), 4);
    }

    #[test]
    fn single_day_range() {
        let job = CrawlJob::new(d(2026, 5, 5), d(2026, 5, 5), vec!["A".into(), "B".into()], Duration::ZERO)
            .unwrap();
        assert_eq!(job.dates().count(), 1);
        assert_eq!(job.pair_count(), 2);
    }

    #[test]
    fn month_job_spans_calendar_month() {
        let job = CrawlJob::for_month(2024, 2, vec!["A".into()], Duration::ZERO).unwrap();
        assert_eq!(job.from(), d(2024, 2, 1));
        assert_eq!(job.to(), d(2024, 2, 29));

        let december = CrawlJob::for_month(2026, 12, vec!["A".into()], Duration::ZERO).unwrap();
        assert_eq!(december.to(), d(2026, 12, 31));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(CrawlJob::new(d(2026, 3, 2), d(2026, 3, 1), vec!["A".into()], Duration::ZERO).is_err());
        assert!(CrawlJob::new(d(2026, 3, 1), d(2026, 3, 1), vec![], Duration::ZERO).is_err());
        assert!(CrawlJob::for_month(2026, 13, vec!["A".into()], Duration::ZERO).is_err());
    }

    #[test]
    fn range_tag_names_both_ends() {
        let job = CrawlJob::for_month(2026, 4, vec!["A".into()], Duration::ZERO).unwrap();
        assert_eq!(job.range_tag(), "2026-04-01_2026-04-30");
    }
}
