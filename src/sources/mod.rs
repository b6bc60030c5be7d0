pub mod directory;
pub mod sample;
pub mod search;

use std::future::Future;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::company::Company;
use crate::scraper::Pacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Google results through SerpApi
    Search,
    /// Paginated company directory scraped via spider.cloud
    Directory,
    /// Synthetic companies, no network
    Sample,
}

/// Produces raw company records for one industry.
pub trait CompanySource {
    fn name(&self) -> &'static str;

    /// Up to `limit` companies for `industry`, each stamped with an industry label.
    fn fetch(&self, industry: &str, limit: usize) -> impl Future<Output = Result<Vec<Company>>> + Send;
}

/// Query every industry in turn. A failing industry is logged and contributes
/// nothing; the others still run.
pub async fn collect<S: CompanySource>(
    source: &S,
    industries: &[String],
    per_industry: usize,
    pacing: Pacing,
) -> Vec<Company> {
    let mut all = Vec::new();

    for (i, industry) in industries.iter().enumerate() {
        if i > 0 {
            pacing.wait().await;
        }
        info!(source = source.name(), industry = industry.as_str(), "Collecting companies");
        match source.fetch(industry, per_industry).await {
            Ok(companies) => {
                info!(industry = industry.as_str(), "Collected {} companies", companies.len());
                all.extend(companies);
            }
            Err(e) => warn!(industry = industry.as_str(), "Error collecting companies: {:#}", e),
        }
    }

    all
}
