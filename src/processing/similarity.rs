use std::time::Instant;

use thiserror::Error;

use crate::CancelToken;
use crate::progress::ProgressObserver;

/// Reporting granularity of the scoring pass, in percent.
const PROGRESS_STEP: u8 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum RankingError {
    #[error("no scored records to select from")]
    EmptyInput,
    #[error("similarity threshold {0} is outside 0.0..=1.0")]
    InvalidThreshold(f64),
    #[error("result set size must be at least 1, got {0}")]
    InvalidResultSize(usize),
    #[error("scoring cancelled")]
    Cancelled,
}

/// One record paired with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
}

/// Outcome of a search: matches above the threshold, or the single closest
/// miss when nothing qualified. Callers render the two cases differently.
#[derive(Debug, Clone, PartialEq)]
pub enum RankedResult<T> {
    /// Records at or above the threshold, best first, at most the requested
    /// result-set size.
    TopK(Vec<Scored<T>>),
    /// Nothing reached the threshold; this is the best-scoring record of
    /// the whole input.
    ClosestMiss(Scored<T>),
}

/// Checks selection arguments without scoring anything, so a bad threshold
/// or result size fails before a full scan is spent.
pub fn validate_selection(threshold: f64, max_results: usize) -> Result<(), RankingError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(RankingError::InvalidThreshold(threshold));
    }
    if max_results < 1 {
        return Err(RankingError::InvalidResultSize(max_results));
    }
    Ok(())
}

/// Scores every record against `query`, in input order.
///
/// The query and each record's comparison text are folded to uppercase
/// before `similarity` runs; a record without text is compared as the empty
/// string, never skipped, so the output always has one entry per input.
/// A cumulative percentage signal fires each time a record crosses a
/// [`PROGRESS_STEP`] boundary, and 100 fires exactly once at the end even
/// for totals the step does not divide. Empty input returns an empty vec
/// without invoking `similarity` at all.
pub fn score_all<T, S, K>(
    items: Vec<T>,
    query: &str,
    similarity: S,
    comparison_text: K,
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> Result<Vec<Scored<T>>, RankingError>
where
    S: Fn(&str, &str) -> f64,
    K: Fn(&T) -> Option<&str>,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let folded_query = query.to_uppercase();
    let started = Instant::now();
    let mut scored = Vec::with_capacity(total);
    let mut next_percent = PROGRESS_STEP;
    for (index, item) in items.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(RankingError::Cancelled);
        }
        let folded = comparison_text(&item).unwrap_or_default().to_uppercase();
        let score = similarity(&folded_query, &folded);
        scored.push(Scored { item, score });
        let done = ((index + 1) * 100 / total) as u8;
        if done >= next_percent {
            if done < 100 {
                progress.scoring_progress(done);
            }
            while next_percent <= done {
                next_percent += PROGRESS_STEP;
            }
        }
    }
    progress.scoring_progress(100);
    log::debug!("Scored {total} records in {:?}", started.elapsed());
    Ok(scored)
}

/// Selects the final outcome from a scored list.
///
/// Scores at or above `threshold` are kept (the boundary is inclusive),
/// sorted descending with ties staying in input order, and truncated to
/// `max_results`. When nothing qualifies the single best-scoring record is
/// returned as a closest miss instead of an empty list.
pub fn select_top_k<T>(
    mut scored: Vec<Scored<T>>,
    threshold: f64,
    max_results: usize,
) -> Result<RankedResult<T>, RankingError> {
    validate_selection(threshold, max_results)?;
    if scored.is_empty() {
        return Err(RankingError::EmptyInput);
    }
    if !scored.iter().any(|s| s.score >= threshold) {
        // First-seen wins among equal scores.
        let mut best = 0;
        for (index, candidate) in scored.iter().enumerate().skip(1) {
            if candidate.score > scored[best].score {
                best = index;
            }
        }
        return Ok(RankedResult::ClosestMiss(scored.swap_remove(best)));
    }
    let mut ranked: Vec<Scored<T>> = scored
        .into_iter()
        .filter(|s| s.score >= threshold)
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(max_results);
    Ok(RankedResult::TopK(ranked))
}
