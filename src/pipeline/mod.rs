//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: log in, walk the job's dates and facilities, collect results
//! - `run_export`: write the JSON results and both CSV views

pub mod circuit_breaker;
pub mod crawl;
pub mod export;
pub mod rate_limit;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStatus};
pub use crawl::{CrawlOrchestrator, CrawlPhase, CrawlReport, CrawlStats};
pub use export::{ExportRow, Table};
pub use rate_limit::{FixedDelay, NoDelay, RateLimiter};

use crate::error::Result;
use crate::models::{Config, CrawlJob};
use crate::services::session::{Credentials, HttpTransport, PortalGateway};
use crate::storage::{ResultStorage, WriteSummary};
use crate::utils::http;

/// Run a crawl job against the configured portal over HTTP.
pub async fn run_crawler(
    config: &Config,
    job: &CrawlJob,
    credentials: &Credentials,
) -> Result<CrawlReport> {
    config.validate()?;
    log::info!(
        "Crawling {} to {} for {} facilities ({} requests)",
        job.from(),
        job.to(),
        job.facility_ids().len(),
        job.pair_count()
    );

    let client = http::create_client(&config.crawler)?;
    let gateway = PortalGateway::new(HttpTransport::new(client), config.portal.clone())?;
    let limiter = FixedDelay::new(job.inter_request_delay());
    log::debug!("Pacing calls {:?} apart", limiter.delay());

    let mut orchestrator = CrawlOrchestrator::new(
        gateway,
        limiter,
        config.portal.format,
        config.facilities.clone(),
        CircuitBreakerConfig::from(&config.breaker),
    );
    orchestrator.run(job, credentials).await
}

/// Aggregate a report and persist every export view.
pub async fn run_export(
    config: &Config,
    storage: &dyn ResultStorage,
    job: &CrawlJob,
    report: &CrawlReport,
) -> Result<WriteSummary> {
    let rows = export::collect_rows(&report.results);
    let full = export::full_table(&rows, &config.output);
    let available = export::availability_table(&rows);

    let summary = storage
        .write_results(&job.range_tag(), &report.results, &full, &available)
        .await?;

    for (date, facility, error) in export::failed_pairs(&report.results) {
        log::warn!("Missing data for {} {}: {}", facility, date, error);
    }
    Ok(summary)
}
