use std::path::PathBuf;

use thiserror::Error;

use crate::domain::company::Company;

pub mod file;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No snapshot has been written yet; load companies from the registry
    /// first.
    #[error("no company snapshot at {}; load companies from the registry first", .0.display())]
    SnapshotMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode or decode the company snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub trait CompanyReader {
    fn load_companies(&self) -> RepositoryResult<Vec<Company>>;
}

pub trait CompanyWriter {
    fn save_companies(&self, companies: &[Company]) -> RepositoryResult<usize>;
}
