//! JSON snapshot store for company records.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::company::Company;
use crate::repository::{CompanyReader, CompanyWriter, RepositoryError, RepositoryResult};

/// Stores the full company list as one JSON file.
///
/// An existing snapshot is renamed to a timestamped backup before being
/// replaced, so the previous load stays recoverable.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d%H%M%S%3f");
        match self.path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => self
                .path
                .with_file_name(format!("{stem}.backup.{stamp}.json")),
            None => self.path.with_extension(format!("backup.{stamp}.json")),
        }
    }

    /// Moves an existing snapshot out of the way. A failed rename is logged
    /// and tolerated; the save then overwrites in place.
    fn rotate_backup(&self) {
        if !self.path.exists() {
            return;
        }
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup) {
            Ok(()) => log::debug!("Moved previous snapshot to {}", backup.display()),
            Err(e) => log::warn!(
                "Failed to back up previous snapshot {}: {e}",
                self.path.display()
            ),
        }
    }
}

impl CompanyReader for JsonFileRepository {
    fn load_companies(&self) -> RepositoryResult<Vec<Company>> {
        let body = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RepositoryError::SnapshotMissing(self.path.clone())
            } else {
                RepositoryError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl CompanyWriter for JsonFileRepository {
    fn save_companies(&self, companies: &[Company]) -> RepositoryResult<usize> {
        self.rotate_backup();
        let body = serde_json::to_string(companies)?;
        fs::write(&self.path, body)?;
        Ok(companies.len())
    }
}
