use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod domain;
pub mod models;
pub mod processing;
pub mod progress;
pub mod registry;
pub mod repository;

/// Default similarity a company must reach to count as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;
/// Default number of ranked matches returned.
pub const RESULT_SET_SIZE: usize = 10;

/// Cooperative cancellation flag shared between a run and its controller.
///
/// Checked between page fetches and between record-scoring steps, so setting
/// it never corrupts data already persisted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
