use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One company record from the PRH open-data registry.
///
/// Snapshots on disk and ranking both work on this type; the registry wire
/// format is mapped into it at the fetch boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub business_id: String,
    pub name: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub company_form: Option<String>,
    pub details_uri: Option<String>,
}

impl Company {
    /// Text the similarity ranker compares against the query.
    pub fn comparison_text(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
