//! Helpers for integration tests.

use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use company_search::domain::company::Company;

/// Temporary snapshot location removed when dropped.
pub struct TestSnapshot {
    dir: TempDir,
}

impl TestSnapshot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir."),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("companies.json")
    }

    /// File names currently in the snapshot directory, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("Failed to read temp dir.")
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

pub fn company(business_id: &str, name: &str) -> Company {
    Company {
        business_id: business_id.to_string(),
        name: Some(name.to_string()),
        registration_date: NaiveDate::from_ymd_opt(2015, 6, 1),
        company_form: Some("OY".to_string()),
        details_uri: None,
    }
}

pub fn companies(names: &[&str]) -> Vec<Company> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| company(&format!("{i:07}-1"), name))
        .collect()
}
