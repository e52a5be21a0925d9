use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::CancelToken;
use crate::domain::company::Company;
use crate::progress::ProgressObserver;

pub mod prh;

/// Largest page the registry serves in one request.
pub const MAX_PAGE_SIZE: u32 = 1000;
/// Wait after the first throttled response, in milliseconds.
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 5000;
/// Added to the wait after every further throttled response, in milliseconds.
pub const DEFAULT_BACKOFF_INCREMENT_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Caller asked for more records per page than the registry allows.
    /// Raised before any request is sent; never silently clamped.
    #[error("page size {0} exceeds the registry maximum of 1000")]
    PageSizeTooLarge(u32),
    #[error("failed to build registry client: {0}")]
    Build(String),
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("company load cancelled")]
    Cancelled,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration-date filter applied to every page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationSpan {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

/// One bounded batch of companies returned by a single page request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyPage {
    pub companies: Vec<Company>,
}

impl CompanyPage {
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// Pagination cursor: a starting offset plus the page size bound.
///
/// The ingestion loop advances the offset by exactly the page size after
/// every fetched page; the offset never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    offset: u64,
    page_size: u32,
}

impl FetchWindow {
    pub fn new(offset: u64, page_size: u32) -> Self {
        Self { offset, page_size }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Moves the window to the next page.
    pub fn advance(&mut self) {
        self.offset += u64::from(self.page_size);
    }
}

/// Growing delay applied between throttled attempts.
///
/// Owned by a single ingestion run; the delay only ever grows while the run
/// is alive. Concurrent runs each carry their own instance.
#[derive(Debug, Clone)]
pub struct BackoffState {
    delay: Duration,
    increment: Duration,
}

impl BackoffState {
    pub fn new(initial: Duration, increment: Duration) -> Self {
        Self {
            delay: initial,
            increment,
        }
    }

    /// Returns the wait for the throttled attempt just observed and grows
    /// the delay for the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay += self.increment;
        delay
    }

    pub fn current(&self) -> Duration {
        self.delay
    }
}

/// Whether a fatal page error aborts the whole load or yields a partial one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceMode {
    /// Propagate the first fatal page error; no partial result.
    Strict,
    /// Stop at the first fatal page error but keep everything fetched so
    /// far, reporting the error alongside the partial list.
    Tolerant,
}

/// Result of one full ingestion run.
#[derive(Debug)]
pub struct CompanyLoad {
    pub companies: Vec<Company>,
    /// Set when a tolerant run absorbed a fatal page error; the company list
    /// is then partial.
    pub failure: Option<RegistryError>,
}

/// Outcome of a single page request, before any retrying.
#[derive(Debug, PartialEq)]
pub(crate) enum PageAttempt {
    /// The registry asked us to slow down; retry the same page later.
    Throttled,
    /// No data at this offset.
    Missing,
    Page(CompanyPage),
}

/// A paginated source of [`Company`] records.
#[async_trait]
pub trait CompanyRegistry: Send + Sync {
    /// Fetches the page at the window's offset.
    ///
    /// Returns `Ok(None)` when the registry has no data at the offset.
    /// Throttled responses are retried indefinitely, waiting a growing delay
    /// taken from `backoff` between attempts; any other non-success response
    /// is an error for this call.
    async fn fetch_page(
        &self,
        span: &RegistrationSpan,
        window: FetchWindow,
        backoff: &mut BackoffState,
        progress: &dyn ProgressObserver,
    ) -> RegistryResult<Option<CompanyPage>>;
}

/// Builds the HTTP client shared by registry implementations.
pub fn build_reqwest_client() -> RegistryResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("company-search/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()?)
}

/// Drives one page request until it yields a non-throttled outcome.
///
/// Emits a progress signal per attempt and a distinct one per throttle.
/// There is no retry cap: persistent throttling degrades to slower and
/// slower polling instead of failing the run.
pub(crate) async fn retry_throttled<F, Fut>(
    backoff: &mut BackoffState,
    progress: &dyn ProgressObserver,
    mut attempt: F,
) -> RegistryResult<Option<CompanyPage>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RegistryResult<PageAttempt>>,
{
    loop {
        progress.page_attempt();
        match attempt().await? {
            PageAttempt::Throttled => {
                let delay = backoff.next_delay();
                progress.throttled(delay);
                tokio::time::sleep(delay).await;
            }
            PageAttempt::Missing => return Ok(None),
            PageAttempt::Page(page) => return Ok(Some(page)),
        }
    }
}

/// Loads every company the registry exposes for `span`, page by page.
///
/// The offset advances by exactly the page size after each request no matter
/// how many records came back; the loop stops at the first page with zero
/// records (a not-found response counts as zero). The registry paginates by
/// offset, so records can be skipped or duplicated if the remote data set
/// changes between page requests.
///
/// Cancellation is honored between page boundaries and follows the tolerance
/// mode, like any other aborted load.
pub async fn load_all<R>(
    registry: &R,
    span: &RegistrationSpan,
    mut window: FetchWindow,
    mut backoff: BackoffState,
    mode: ToleranceMode,
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> RegistryResult<CompanyLoad>
where
    R: CompanyRegistry + ?Sized,
{
    let mut companies = Vec::new();
    loop {
        if cancel.is_cancelled() {
            match mode {
                ToleranceMode::Tolerant => {
                    log::warn!(
                        "Company load cancelled after {} companies",
                        companies.len()
                    );
                    return Ok(CompanyLoad {
                        companies,
                        failure: Some(RegistryError::Cancelled),
                    });
                }
                ToleranceMode::Strict => return Err(RegistryError::Cancelled),
            }
        }
        match registry
            .fetch_page(span, window, &mut backoff, progress)
            .await
        {
            Ok(Some(page)) if !page.is_empty() => {
                log::debug!("Fetched {} companies at offset {}", page.len(), window.offset());
                companies.extend(page.companies);
                window.advance();
            }
            Ok(_) => break,
            Err(e) => match mode {
                ToleranceMode::Tolerant => {
                    log::warn!(
                        "Company load aborted after {} companies: {e}",
                        companies.len()
                    );
                    return Ok(CompanyLoad {
                        companies,
                        failure: Some(e),
                    });
                }
                ToleranceMode::Strict => return Err(e),
            },
        }
    }
    Ok(CompanyLoad {
        companies,
        failure: None,
    })
}
