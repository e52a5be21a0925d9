//! End-to-end searches over a scripted registry and a temporary snapshot.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use company_search::CancelToken;
use company_search::models::config::SearchOptions;
use company_search::processing::similarity::{RankedResult, RankingError};
use company_search::processing::{SearchError, run_search};
use company_search::progress::{NoopProgress, ProgressObserver};
use company_search::registry::{
    BackoffState, CompanyPage, CompanyRegistry, FetchWindow, RegistrationSpan, RegistryError,
    RegistryResult, ToleranceMode,
};
use company_search::repository::file::JsonFileRepository;
use company_search::repository::{CompanyReader, CompanyWriter};

use common::{TestSnapshot, companies};

/// Registry replaying a fixed script of page results.
struct ScriptedRegistry {
    script: Mutex<VecDeque<RegistryResult<Option<CompanyPage>>>>,
    calls: AtomicUsize,
}

impl ScriptedRegistry {
    fn new(script: Vec<RegistryResult<Option<CompanyPage>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompanyRegistry for ScriptedRegistry {
    async fn fetch_page(
        &self,
        _span: &RegistrationSpan,
        _window: FetchWindow,
        _backoff: &mut BackoffState,
        _progress: &dyn ProgressObserver,
    ) -> RegistryResult<Option<CompanyPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("script exhausted")
    }
}

#[derive(Default)]
struct RecordingProgress {
    loaded_total: Mutex<Option<usize>>,
    hundred_signals: AtomicUsize,
}

impl ProgressObserver for RecordingProgress {
    fn page_attempt(&self) {}
    fn throttled(&self, _delay: Duration) {}
    fn load_complete(&self, total: usize) {
        *self.loaded_total.lock().expect("loaded lock") = Some(total);
    }
    fn scoring_progress(&self, percent: u8) {
        if percent == 100 {
            self.hundred_signals.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn page(names: &[&str]) -> RegistryResult<Option<CompanyPage>> {
    Ok(Some(CompanyPage {
        companies: companies(names),
    }))
}

fn server_error() -> RegistryResult<Option<CompanyPage>> {
    Err(RegistryError::Status(
        reqwest::StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

fn options(query: &str, reload: bool, tolerance: ToleranceMode) -> SearchOptions {
    SearchOptions {
        query: query.to_string(),
        threshold: 0.8,
        max_results: 10,
        registration: RegistrationSpan {
            from: NaiveDate::from_ymd_opt(2010, 1, 1).expect("valid date"),
            to: None,
        },
        reload,
        tolerance,
    }
}

/// Deterministic stand-in for the string-similarity capability. Both sides
/// arrive already case-folded, so containment checks work on upper case.
fn similarity(query: &str, name: &str) -> f64 {
    if name == query {
        1.0
    } else if name.contains(query) {
        0.9
    } else {
        0.1
    }
}

fn window() -> FetchWindow {
    FetchWindow::new(0, 1000)
}

fn backoff() -> BackoffState {
    BackoffState::new(Duration::ZERO, Duration::ZERO)
}

#[tokio::test]
async fn reload_fetches_ranks_and_persists() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    let registry = ScriptedRegistry::new(vec![page(&["Acme Oy", "Nordic Works"]), page(&[])]);
    let progress = RecordingProgress::default();

    let report = run_search(
        &registry,
        &repo,
        similarity,
        &options("Acme", true, ToleranceMode::Tolerant),
        window(),
        backoff(),
        &CancelToken::new(),
        &progress,
    )
    .await
    .expect("search");

    assert_eq!(report.companies_total, 2);
    assert!(report.load_failure.is_none());
    match report.outcome {
        RankedResult::TopK(top) => {
            assert_eq!(top.len(), 1);
            assert_eq!(top[0].item.name.as_deref(), Some("Acme Oy"));
            assert_eq!(top[0].score, 0.9);
        }
        RankedResult::ClosestMiss(_) => panic!("expected a ranked list"),
    }

    // The fetched list is now the snapshot, and progress saw the whole run.
    assert_eq!(repo.load_companies().expect("load").len(), 2);
    assert_eq!(*progress.loaded_total.lock().expect("loaded lock"), Some(2));
    assert_eq!(progress.hundred_signals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_run_reads_snapshot_without_fetching() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    repo.save_companies(&companies(&["Acme Oy"]))
        .expect("seed snapshot");
    let registry = ScriptedRegistry::new(vec![]);

    let report = run_search(
        &registry,
        &repo,
        similarity,
        &options("Acme", false, ToleranceMode::Tolerant),
        window(),
        backoff(),
        &CancelToken::new(),
        &NoopProgress,
    )
    .await
    .expect("search");

    assert_eq!(registry.calls(), 0);
    assert_eq!(report.companies_total, 1);
    assert!(matches!(report.outcome, RankedResult::TopK(top) if top.len() == 1));
}

#[tokio::test]
async fn tolerant_reload_keeps_partial_result_and_failure() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    let registry = ScriptedRegistry::new(vec![page(&["Acme Oy"]), server_error()]);

    let report = run_search(
        &registry,
        &repo,
        similarity,
        &options("Acme", true, ToleranceMode::Tolerant),
        window(),
        backoff(),
        &CancelToken::new(),
        &NoopProgress,
    )
    .await
    .expect("tolerant search");

    assert_eq!(report.companies_total, 1);
    assert!(matches!(
        report.load_failure,
        Some(RegistryError::Status(_))
    ));
    // The partial list was still persisted.
    assert_eq!(repo.load_companies().expect("load").len(), 1);
}

#[tokio::test]
async fn strict_reload_propagates_and_persists_nothing() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    let registry = ScriptedRegistry::new(vec![page(&["Acme Oy"]), server_error()]);

    let result = run_search(
        &registry,
        &repo,
        similarity,
        &options("Acme", true, ToleranceMode::Strict),
        window(),
        backoff(),
        &CancelToken::new(),
        &NoopProgress,
    )
    .await;

    assert!(matches!(
        result,
        Err(SearchError::Registry(RegistryError::Status(_)))
    ));
    assert!(snapshot.files().is_empty());
}

#[tokio::test]
async fn closest_miss_when_nothing_clears_the_threshold() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    repo.save_companies(&companies(&["Nordic Works", "Keskinen Kone"]))
        .expect("seed snapshot");

    let report = run_search(
        &ScriptedRegistry::new(vec![]),
        &repo,
        similarity,
        &options("Acme", false, ToleranceMode::Tolerant),
        window(),
        backoff(),
        &CancelToken::new(),
        &NoopProgress,
    )
    .await
    .expect("search");

    match report.outcome {
        RankedResult::ClosestMiss(miss) => {
            // Equal scores keep the first-seen record.
            assert_eq!(miss.item.name.as_deref(), Some("Nordic Works"));
            assert_eq!(miss.score, 0.1);
        }
        RankedResult::TopK(_) => panic!("expected a closest miss"),
    }
}

#[tokio::test]
async fn empty_snapshot_signals_empty_input() {
    let snapshot = TestSnapshot::new();
    let repo = JsonFileRepository::new(snapshot.path());
    repo.save_companies(&[]).expect("seed snapshot");

    let result = run_search(
        &ScriptedRegistry::new(vec![]),
        &repo,
        similarity,
        &options("Acme", false, ToleranceMode::Tolerant),
        window(),
        backoff(),
        &CancelToken::new(),
        &NoopProgress,
    )
    .await;

    assert!(matches!(
        result,
        Err(SearchError::Ranking(RankingError::EmptyInput))
    ));
}
