use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::Parser;

use company_search::models::config::{AppConfig, SearchOptions};
use company_search::processing::similarity::{RankedResult, RankingError};
use company_search::processing::{SearchError, SearchReport, run_search};
use company_search::progress::LogProgress;
use company_search::registry::prh::PrhRegistry;
use company_search::registry::{BackoffState, FetchWindow, RegistrationSpan, ToleranceMode};
use company_search::repository::file::JsonFileRepository;
use company_search::{CancelToken, RESULT_SET_SIZE, SIMILARITY_THRESHOLD};

/// Search companies in the PRH open-data registry by name similarity.
#[derive(Parser, Debug)]
#[command(name = "company-search", version, about)]
struct Cli {
    /// Company name to search for.
    #[arg(short = 'f', long)]
    find: String,
    /// Reload the full company list from the registry before searching.
    #[arg(short = 'l', long)]
    load: bool,
    /// Similarity a company must reach to count as a match (0.0..=1.0).
    #[arg(short = 't', long, default_value_t = SIMILARITY_THRESHOLD)]
    threshold: f64,
    /// Number of ranked matches to show.
    #[arg(short = 's', long, default_value_t = RESULT_SET_SIZE)]
    size: usize,
    /// Only companies registered on or after this date (YYYY-MM-DD).
    #[arg(short = 'r', long, default_value = "2010-01-01", value_parser = parse_date)]
    registration_from: NaiveDate,
    /// Only companies registered on or before this date (YYYY-MM-DD).
    #[arg(short = 'e', long, value_parser = parse_date)]
    registration_to: Option<NaiveDate>,
    /// Abort a reload on the first page failure instead of keeping a
    /// partial snapshot.
    #[arg(long)]
    strict: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

impl Cli {
    fn into_options(self) -> SearchOptions {
        SearchOptions {
            query: self.find,
            threshold: self.threshold,
            max_results: self.size,
            registration: RegistrationSpan {
                from: self.registration_from,
                to: self.registration_to,
            },
            reload: self.load,
            tolerance: if self.strict {
                ToleranceMode::Strict
            } else {
                ToleranceMode::Tolerant
            },
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let options = Cli::parse().into_options();
    if let Err(e) = options.validate() {
        log::error!("{e}");
        std::process::exit(1);
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let registry = match PrhRegistry::new(&config.registry_url) {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("Failed to build registry client: {e}");
            std::process::exit(1);
        }
    };
    let repository = JsonFileRepository::new(&config.snapshot_path);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received; stopping at the next safe point");
                cancel.cancel();
            }
        });
    }

    let window = FetchWindow::new(config.start_offset, config.page_size);
    let backoff = BackoffState::new(
        Duration::from_millis(config.backoff_initial_ms),
        Duration::from_millis(config.backoff_increment_ms),
    );

    let started = Instant::now();
    match run_search(
        &registry,
        &repository,
        strsim::jaro_winkler,
        &options,
        window,
        backoff,
        &cancel,
        &LogProgress,
    )
    .await
    {
        Ok(report) => render(&options, &report),
        Err(SearchError::Ranking(RankingError::EmptyInput)) => {
            log::warn!("No companies to search; load a snapshot or widen the registration span");
        }
        Err(e) => {
            log::error!("Search failed: {e}");
            std::process::exit(1);
        }
    }
    log::info!("Finished in {:.2}s", started.elapsed().as_secs_f64());
}

fn render(options: &SearchOptions, report: &SearchReport) {
    if let Some(failure) = &report.load_failure {
        log::warn!("Company list is partial; the load stopped early: {failure}");
    }
    match &report.outcome {
        RankedResult::TopK(matches) => {
            log::info!(
                "Top {} of {} companies matching \"{}\":",
                matches.len(),
                report.companies_total,
                options.query
            );
            for m in matches {
                log::info!(
                    "  {:.4}  {}  {}",
                    m.score,
                    m.item.business_id,
                    m.item.name.as_deref().unwrap_or("(unnamed)")
                );
            }
        }
        RankedResult::ClosestMiss(miss) => {
            log::warn!(
                "No company reached threshold {}; closest miss: {:.4}  {}  {}",
                options.threshold,
                miss.score,
                miss.item.business_id,
                miss.item.name.as_deref().unwrap_or("(unnamed)")
            );
        }
    }
}
