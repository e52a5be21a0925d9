use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::domain::company::Company;
use crate::progress::ProgressObserver;
use crate::registry::{
    BackoffState, CompanyPage, CompanyRegistry, FetchWindow, MAX_PAGE_SIZE, PageAttempt,
    RegistrationSpan, RegistryError, RegistryResult, build_reqwest_client, retry_throttled,
};

/// Default base URL of the PRH open-data service.
pub const DEFAULT_REGISTRY_URL: &str = "https://avoindata.prh.fi";

/// Client for the PRH open-data company registry (`bis/v1`).
pub struct PrhRegistry {
    base_url: Url,
    client: reqwest::Client,
}

impl PrhRegistry {
    pub fn new(base_url: &str) -> RegistryResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url).map_err(|e| RegistryError::Build(e.to_string()))?,
            client: build_reqwest_client()?,
        })
    }

    /// Builds the page request URL for one window.
    ///
    /// `totalResults` is always disabled; counting the full result set on the
    /// server makes every page slower and the loop does not need it.
    fn page_url(&self, span: &RegistrationSpan, window: FetchWindow) -> RegistryResult<Url> {
        let mut url = self
            .base_url
            .join("bis/v1")
            .map_err(|e| RegistryError::Build(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("totalResults", "false")
                .append_pair("maxResults", &window.page_size().to_string())
                .append_pair("resultsFrom", &window.offset().to_string())
                .append_pair(
                    "companyRegistrationFrom",
                    &span.from.format("%Y-%m-%d").to_string(),
                );
            if let Some(to) = span.to {
                query.append_pair("companyRegistrationTo", &to.format("%Y-%m-%d").to_string());
            }
        }
        Ok(url)
    }

    /// Issues a single request for the page, without any retrying.
    async fn request_page(&self, url: &Url) -> RegistryResult<PageAttempt> {
        let res = self.client.get(url.as_str()).send().await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(PageAttempt::Throttled);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(PageAttempt::Missing);
        }
        if !status.is_success() {
            log::error!("Failed to get URL {}: {}", url, status);
            return Err(RegistryError::Status(status));
        }
        let body = res.text().await?;
        let envelope: PageEnvelope = serde_json::from_str(&body)?;
        Ok(PageAttempt::Page(envelope.into()))
    }
}

#[async_trait]
impl CompanyRegistry for PrhRegistry {
    async fn fetch_page(
        &self,
        span: &RegistrationSpan,
        window: FetchWindow,
        backoff: &mut BackoffState,
        progress: &dyn ProgressObserver,
    ) -> RegistryResult<Option<CompanyPage>> {
        if window.page_size() > MAX_PAGE_SIZE {
            return Err(RegistryError::PageSizeTooLarge(window.page_size()));
        }
        let url = self.page_url(span, window)?;
        retry_throttled(backoff, progress, || self.request_page(&url)).await
    }
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    results: Vec<CompanyRecord>,
}

#[derive(Debug, Deserialize)]
struct CompanyRecord {
    #[serde(rename = "businessId")]
    business_id: String,
    name: Option<String>,
    #[serde(rename = "registrationDate")]
    registration_date: Option<NaiveDate>,
    #[serde(rename = "companyForm")]
    company_form: Option<String>,
    #[serde(rename = "detailsUri")]
    details_uri: Option<String>,
}

impl From<CompanyRecord> for Company {
    fn from(record: CompanyRecord) -> Self {
        Company {
            business_id: record.business_id,
            name: record.name,
            registration_date: record.registration_date,
            company_form: record.company_form,
            details_uri: record.details_uri,
        }
    }
}

impl From<PageEnvelope> for CompanyPage {
    fn from(envelope: PageEnvelope) -> Self {
        CompanyPage {
            companies: envelope.results.into_iter().map(Company::from).collect(),
        }
    }
}
