// src/pipeline/crawl.rs

//! Availability crawl orchestration.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CourtAvailability, CrawlJob, DailyResult, Facility, ResponseFormat};
use crate::pipeline::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::pipeline::rate_limit::RateLimiter;
use crate::services::normalize;
use crate::services::session::{AuthContext, AvailabilityRequest, Credentials, SessionGateway};

/// Lifecycle of one crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Init,
    Authenticating,
    Running,
    Done,
    Aborted,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub pair_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub breaker_denied: usize,
    pub slot_total: usize,
    pub available_total: usize,
}

impl CrawlStats {
    fn new(pair_count: usize) -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            pair_count,
            succeeded: 0,
            failed: 0,
            breaker_denied: 0,
            slot_total: 0,
            available_total: 0,
        }
    }

    fn record(&mut self, result: &DailyResult) {
        if result.is_success() {
            self.succeeded += 1;
            self.slot_total += result.slot_total;
            self.available_total += result.available_total;
        } else {
            self.failed += 1;
        }
    }

    /// Share of pairs that produced data.
    pub fn success_rate(&self) -> f64 {
        if self.pair_count == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.pair_count as f64
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub phase: CrawlPhase,
    pub results: Vec<DailyResult>,
    pub stats: CrawlStats,
    pub breaker: CircuitState,
}

/// Walks a date range across facilities, one call at a time.
pub struct CrawlOrchestrator<G, R> {
    gateway: G,
    limiter: R,
    format: ResponseFormat,
    facilities: Vec<Facility>,
    breaker_config: CircuitBreakerConfig,
    phase: CrawlPhase,
}

impl<G: SessionGateway, R: RateLimiter> CrawlOrchestrator<G, R> {
    pub fn new(
        gateway: G,
        limiter: R,
        format: ResponseFormat,
        facilities: Vec<Facility>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            gateway,
            limiter,
            format,
            facilities,
            breaker_config,
            phase: CrawlPhase::Init,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Resolve the job's facility ids against the roster, keeping job order.
    fn select_facilities(&self, job: &CrawlJob) -> Result<Vec<Facility>> {
        job.facility_ids()
            .iter()
            .map(|id| {
                self.facilities
                    .iter()
                    .find(|f| &f.id == id)
                    .cloned()
                    .ok_or_else(|| AppError::config(format!("unknown facility '{id}'")))
            })
            .collect()
    }

    /// Run the job to completion.
    ///
    /// Only a failed login (or an unknown facility) ends the run early. Every
    /// other failure becomes an error entry for its `(date, facility)` pair,
    /// so the report always covers the whole range.
    pub async fn run(&mut self, job: &CrawlJob, credentials: &Credentials) -> Result<CrawlReport> {
        self.phase = CrawlPhase::Init;
        let facilities = self.select_facilities(job)?;

        self.phase = CrawlPhase::Authenticating;
        let context = match self.gateway.authenticate(credentials).await {
            Ok(context) => context,
            Err(error) => {
                self.phase = CrawlPhase::Aborted;
                log::error!("Authentication failed, aborting run: {}", error);
                return Err(match error {
                    AppError::Auth(_) => error,
                    other => AppError::auth(other.to_string()),
                });
            }
        };
        log::debug!(
            "Session for {} opened at {}",
            context.identifier(),
            context.authenticated_at().format("%H:%M:%S")
        );

        self.phase = CrawlPhase::Running;
        let mut breaker = CircuitBreaker::with_config(self.breaker_config.clone());
        let mut stats = CrawlStats::new(job.pair_count());
        let mut results = Vec::with_capacity(job.pair_count());

        for date in job.dates() {
            for facility in &facilities {
                let request = AvailabilityRequest { facility, date };
                let index = results.len() + 1;

                if !breaker.allow_request() {
                    log::warn!(
                        "[{}/{}] {}: skipped, circuit open",
                        index,
                        stats.pair_count,
                        request.context()
                    );
                    stats.breaker_denied += 1;
                    let result = DailyResult::error(
                        date,
                        &facility.id,
                        &facility.name,
                        AppError::CircuitOpen(request.context()),
                    );
                    stats.record(&result);
                    results.push(result);
                    continue;
                }

                let result = match self.fetch(&mut breaker, &context, &request).await {
                    Ok(courts) => {
                        let result = DailyResult::success(date, &facility.id, &facility.name, courts);
                        log::info!(
                            "[{}/{}] {}: {}/{} slots available",
                            index,
                            stats.pair_count,
                            request.context(),
                            result.available_total,
                            result.slot_total
                        );
                        result
                    }
                    Err(error) => {
                        log::warn!(
                            "[{}/{}] {}: {}",
                            index,
                            stats.pair_count,
                            request.context(),
                            error
                        );
                        DailyResult::error(date, &facility.id, &facility.name, error)
                    }
                };
                stats.record(&result);
                results.push(result);

                // Pause after every attempted pair except the job's last one.
                if index < stats.pair_count {
                    self.limiter.wait().await;
                }
            }
        }

        stats.end_time = Utc::now();
        self.phase = CrawlPhase::Done;
        log::info!(
            "Crawl finished: {} ok, {} failed ({} skipped by breaker)",
            stats.succeeded,
            stats.failed,
            stats.breaker_denied
        );

        Ok(CrawlReport {
            phase: self.phase,
            results,
            stats,
            breaker: breaker.state().clone(),
        })
    }

    /// One guarded call plus normalization. Only the call outcome feeds the
    /// breaker; a body that fails to parse is still a call-level success.
    async fn fetch(
        &self,
        breaker: &mut CircuitBreaker,
        context: &AuthContext,
        request: &AvailabilityRequest<'_>,
    ) -> Result<Vec<CourtAvailability>> {
        let response = match self.gateway.call(context, request).await {
            Ok(response) => {
                breaker.record_success();
                response
            }
            Err(error) => {
                breaker.record_failure();
                return Err(error);
            }
        };
        normalize(self.format, request.facility, request.date, &response.body)
    }
}
