use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::company::{Company, TitleMap};

/// One CSV line; `job_titles` flattened to `"name: title; name: title"`.
#[derive(Debug, Serialize)]
struct LeadRow<'a> {
    name: Option<&'a str>,
    website: Option<&'a str>,
    industry: Option<&'a str>,
    employee_count: Option<&'a str>,
    description: Option<&'a str>,
    job_titles: Option<String>,
    relevance_score: Option<u32>,
}

impl<'a> From<&'a Company> for LeadRow<'a> {
    fn from(c: &'a Company) -> Self {
        LeadRow {
            name: c.name.as_deref(),
            website: c.website.as_deref(),
            industry: c.industry.as_deref(),
            employee_count: c.employee_count.as_deref(),
            description: c.description.as_deref(),
            job_titles: c.job_titles.as_ref().map(flatten_job_titles),
            relevance_score: c.relevance_score,
        }
    }
}

pub fn flatten_job_titles(titles: &TitleMap) -> String {
    titles
        .iter()
        .map(|(name, title)| format!("{}: {}", name, title))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn default_filename() -> String {
    format!("lead_generation_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write `companies` to `<dir>/<filename>` (default name is timestamped),
/// creating `dir` if needed. Returns the written path.
pub fn export_to_csv(companies: &[Company], dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
    let filename = filename.map(str::to_string).unwrap_or_else(default_filename);

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(filename);

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for company in companies {
        writer.serialize(LeadRow::from(company))?;
    }
    writer.flush()?;

    info!("Results exported to {}", path.display());
    Ok(path)
}
