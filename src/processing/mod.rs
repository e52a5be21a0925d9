use thiserror::Error;

use crate::CancelToken;
use crate::domain::company::Company;
use crate::models::config::SearchOptions;
use crate::processing::similarity::{
    RankedResult, RankingError, score_all, select_top_k, validate_selection,
};
use crate::progress::ProgressObserver;
use crate::registry::{BackoffState, CompanyRegistry, FetchWindow, RegistryError, load_all};
use crate::repository::{CompanyReader, CompanyWriter, RepositoryError};

pub mod similarity;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
}

/// Everything the caller needs to render one finished search.
#[derive(Debug)]
pub struct SearchReport {
    /// Size of the ranked universe, loaded or read from the snapshot.
    pub companies_total: usize,
    /// Set when a tolerant reload absorbed a fatal page error; the ranked
    /// universe is then a partial load.
    pub load_failure: Option<RegistryError>,
    pub outcome: RankedResult<Company>,
}

/// Runs one full search: obtain the company list, score it against the
/// query, select the outcome.
///
/// With `options.reload` set the list is fetched from the registry and
/// persisted through `repository` (partial or not, matching what the report
/// says); otherwise the existing snapshot is read. Selection arguments are
/// checked before any fetching or scoring, so an invalid threshold never
/// costs a network pass or a full scan.
pub async fn run_search<R, P, S>(
    registry: &R,
    repository: &P,
    similarity: S,
    options: &SearchOptions,
    window: FetchWindow,
    backoff: BackoffState,
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> Result<SearchReport, SearchError>
where
    R: CompanyRegistry + ?Sized,
    P: CompanyReader + CompanyWriter,
    S: Fn(&str, &str) -> f64,
{
    validate_selection(options.threshold, options.max_results)?;

    let (companies, load_failure) = if options.reload {
        log::info!(
            "Loading companies registered from {} from the registry",
            options.registration.from
        );
        let load = load_all(
            registry,
            &options.registration,
            window,
            backoff,
            options.tolerance,
            cancel,
            progress,
        )
        .await?;
        let saved = repository.save_companies(&load.companies)?;
        log::info!("Persisted {saved} companies to the snapshot");
        (load.companies, load.failure)
    } else {
        (repository.load_companies()?, None)
    };
    progress.load_complete(companies.len());

    let companies_total = companies.len();
    let scored = score_all(
        companies,
        &options.query,
        similarity,
        Company::comparison_text,
        cancel,
        progress,
    )?;
    let outcome = select_top_k(scored, options.threshold, options.max_results)?;

    Ok(SearchReport {
        companies_total,
        load_failure,
        outcome,
    })
}
