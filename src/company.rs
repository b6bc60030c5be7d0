use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Person name → job title.
pub type TitleMap = BTreeMap<String, String>;

pub const SOFTWARE_DEVELOPER: &str = "Software Developer";

/// One company as it moves through the pipeline.
///
/// `job_titles` is tri-state: `None` until the enricher has run, then always
/// `Some` with at least one entry. `relevance_score` stays `None` until ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<String>,
    pub description: Option<String>,
    pub job_titles: Option<TitleMap>,
    pub relevance_score: Option<u32>,
}

impl Company {
    /// Name used in log lines.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown company")
    }

    pub fn website(&self) -> Option<&str> {
        non_empty(&self.website)
    }

    pub fn industry(&self) -> Option<&str> {
        non_empty(&self.industry)
    }

    pub fn employee_count(&self) -> Option<&str> {
        non_empty(&self.employee_count)
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// First letter upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Treat `Some("")` the same as a missing field.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
