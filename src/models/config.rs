//! Configuration model loaded from external sources.

use serde::Deserialize;
use thiserror::Error;

use crate::registry::prh::DEFAULT_REGISTRY_URL;
use crate::registry::{
    DEFAULT_BACKOFF_INCREMENT_MS, DEFAULT_BACKOFF_INITIAL_MS, MAX_PAGE_SIZE, RegistrationSpan,
    ToleranceMode,
};

#[derive(Clone, Debug, Deserialize)]
/// Infrastructure settings shared by every run.
pub struct AppConfig {
    pub registry_url: String,
    pub snapshot_path: String,
    pub page_size: u32,
    pub start_offset: u64,
    pub backoff_initial_ms: u64,
    pub backoff_increment_ms: u64,
}

impl AppConfig {
    /// Layers built-in defaults, an optional `company-search.yaml` in the
    /// working directory and `COMPANY_SEARCH_*` environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("registry_url", DEFAULT_REGISTRY_URL)?
            .set_default("snapshot_path", "companies.json")?
            .set_default("page_size", i64::from(MAX_PAGE_SIZE))?
            .set_default("start_offset", 0_i64)?
            .set_default("backoff_initial_ms", DEFAULT_BACKOFF_INITIAL_MS as i64)?
            .set_default("backoff_increment_ms", DEFAULT_BACKOFF_INCREMENT_MS as i64)?
            .add_source(config::File::with_name("company-search").required(false))
            .add_source(config::Environment::with_prefix("COMPANY_SEARCH"))
            .build()?
            .try_deserialize()
    }
}

/// Per-run search options, threaded explicitly through the pipeline.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub query: String,
    pub threshold: f64,
    pub max_results: usize,
    pub registration: RegistrationSpan,
    pub reload: bool,
    pub tolerance: ToleranceMode,
}

/// Every contract violation found in one validation pass.
#[derive(Debug, Error, PartialEq)]
#[error("invalid search options: {}", .problems.join("; "))]
pub struct InvalidOptions {
    pub problems: Vec<String>,
}

impl SearchOptions {
    /// Collects all problems instead of stopping at the first, so a user can
    /// fix the whole command line in one go.
    pub fn validate(&self) -> Result<(), InvalidOptions> {
        let mut problems = Vec::new();
        if !(0.0..=1.0).contains(&self.threshold) {
            problems.push(format!(
                "threshold {} is outside 0.0..=1.0",
                self.threshold
            ));
        }
        if self.max_results < 1 {
            problems.push("result set size must be at least 1".to_string());
        }
        if let Some(to) = self.registration.to
            && to < self.registration.from
        {
            problems.push(format!(
                "registration span ends {to} before it starts {}",
                self.registration.from
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(InvalidOptions { problems })
        }
    }
}
