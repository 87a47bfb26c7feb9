//! Court availability crawler CLI
//!
//! Logs in to the configured booking portal, crawls a date range and writes
//! the JSON results plus CSV exports.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use court_crawler::{
    error::{AppError, Result},
    models::{Config, CrawlJob},
    pipeline::{self, CrawlReport},
    services::Credentials,
    storage::LocalStorage,
};

/// court-crawler - Sports facility availability crawler
#[derive(Parser, Debug)]
#[command(
    name = "court-crawler",
    version,
    about = "Crawls booking portals for open court time slots"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Output directory (overrides output.dir)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl an inclusive date range
    Crawl {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date (YYYY-MM-DD), defaults to --from
        #[arg(long)]
        to: Option<NaiveDate>,

        #[command(flatten)]
        target: Target,
    },

    /// Crawl a whole calendar month
    Month {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u32,

        #[command(flatten)]
        target: Target,
    },

    /// List configured facilities and courts
    Facilities,

    /// Validate the configuration file
    Validate,

    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Facility selection, pacing and login for a crawl.
#[derive(Args, Debug)]
struct Target {
    /// Facility id to crawl (repeatable; default: all configured)
    #[arg(short, long = "facility")]
    facilities: Vec<String>,

    /// Delay between requests in milliseconds (overrides crawler.request_delay_ms)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Portal login identifier
    #[arg(long, env = "PORTAL_USER")]
    user: Option<String>,

    /// Portal login secret
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Target {
    fn facility_ids(&self, config: &Config) -> Vec<String> {
        if self.facilities.is_empty() {
            config.facility_ids()
        } else {
            self.facilities.clone()
        }
    }

    fn delay(&self, config: &Config) -> Duration {
        self.delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.crawler.request_delay())
    }

    fn credentials(&self) -> Result<Credentials> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Ok(Credentials::new(user, password)),
            _ => Err(AppError::config(
                "missing credentials: pass --user/--password or set PORTAL_USER/PORTAL_PASSWORD",
            )),
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Crawl, export and summarize one job.
async fn crawl(config: &Config, storage: &LocalStorage, job: CrawlJob, target: &Target) -> Result<()> {
    let credentials = target.credentials()?;
    let report = pipeline::run_crawler(config, &job, &credentials).await?;
    let written = pipeline::run_export(config, storage, &job, &report).await?;

    print_summary(&report);
    log::info!(
        "Results ({} entries, written {}): {}",
        written.result_count,
        written.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        written.results_location
    );
    log::info!("Full table: {}", written.full_location);
    log::info!(
        "Available slots ({} rows): {}",
        written.available_rows,
        written.available_location
    );
    Ok(())
}

fn print_summary(report: &CrawlReport) {
    let stats = &report.stats;
    log::info!(
        "Summary: {} requests, {} ok, {} failed ({} skipped by breaker), {:.0}% success",
        stats.pair_count,
        stats.succeeded,
        stats.failed,
        stats.breaker_denied,
        stats.success_rate() * 100.0
    );
    log::info!(
        "Slots: {} available of {} ({:.1}s)",
        stats.available_total,
        stats.slot_total,
        (stats.end_time - stats.start_time).num_milliseconds() as f64 / 1000.0
    );
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if let Some(dir) = &cli.output {
        config.output.dir = dir.display().to_string();
    }
    let storage = LocalStorage::new(&config.output.dir);

    match cli.command {
        Command::Crawl { from, to, target } => {
            config.validate()?;
            let job = CrawlJob::new(
                from,
                to.unwrap_or(from),
                target.facility_ids(&config),
                target.delay(&config),
            )?;
            crawl(&config, &storage, job, &target).await?;
        }

        Command::Month {
            year,
            month,
            target,
        } => {
            config.validate()?;
            let job = CrawlJob::for_month(
                year,
                month,
                target.facility_ids(&config),
                target.delay(&config),
            )?;
            crawl(&config, &storage, job, &target).await?;
        }

        Command::Facilities => {
            for facility in &config.facilities {
                log::info!("{} - {}", facility.id, facility.name);
                for court in &facility.courts {
                    log::info!(
                        "    {} (seq {})",
                        facility.court_label(court),
                        court.sequence_id
                    );
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} facilities, {:?} portal)",
                config.facilities.len(),
                config.portal.format
            );
        }

        Command::Init { force } => {
            if cli.config.exists() && !force {
                log::warn!(
                    "Config already exists at {}. Use --force to overwrite.",
                    cli.config.display()
                );
                return Ok(());
            }
            std::fs::write(&cli.config, Config::default().to_toml()?)?;
            log::info!("Starter config written to {}", cli.config.display());
        }
    }

    Ok(())
}
