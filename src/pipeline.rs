use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::company::{capitalize, Company};
use crate::config::Settings;
use crate::enrich::{self, EnrichOptions};
use crate::filter::{self, FilterConfig};
use crate::rank::{self, RankingCriteria};
use crate::sources::{self, CompanySource};
use crate::titles::TitleExtractor;

/// Per-run switches layered over [`Settings`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub industries: Vec<String>,
    pub max_companies: usize,
    pub apply_filters: bool,
    pub apply_ranking: bool,
}

impl RunOptions {
    pub fn per_industry(&self) -> usize {
        (self.max_companies / self.industries.len().max(1)).max(1)
    }

    /// Filters as configured, with an empty industry list standing for this run's industries.
    pub fn filters(&self, settings: &Settings) -> Option<FilterConfig> {
        if !self.apply_filters {
            return None;
        }
        let mut filters = settings.filters.clone();
        if filters.industries.is_empty() {
            filters.industries = self.industries.clone();
        }
        Some(filters)
    }

    /// Ranking criteria, targeting the first selected industry when none is configured.
    pub fn ranking(&self, settings: &Settings) -> Option<RankingCriteria> {
        if !self.apply_ranking {
            return None;
        }
        let mut criteria = settings.ranking.clone();
        if criteria.industry.is_none() {
            criteria.industry = self.industries.first().cloned();
        }
        Some(criteria)
    }
}

#[derive(Debug, Default)]
pub struct StageCounts {
    pub collected: usize,
    pub filtered: usize,
    pub enrich_errors: usize,
    pub ranked: bool,
}

/// Collect → filter → enrich → rank. Single bad records and failing industries are
/// logged and skipped over; nothing here aborts the run.
pub async fn run<S, E>(
    source: &S,
    extractor: Arc<E>,
    settings: &Settings,
    opts: &RunOptions,
) -> (Vec<Company>, StageCounts)
where
    S: CompanySource,
    E: TitleExtractor + Send + Sync + 'static,
{
    let mut counts = StageCounts::default();

    let t_collect = Instant::now();
    let companies = sources::collect(source, &opts.industries, opts.per_industry(), settings.pacing()).await;
    counts.collected = companies.len();
    println!(
        "Collected {} companies from {} in {:.1}s",
        companies.len(),
        source.name(),
        t_collect.elapsed().as_secs_f64()
    );

    let companies = match opts.filters(settings) {
        Some(filters) => {
            let kept = filter::apply_pre_scraping_filters(companies, &filters);
            println!("{} companies passed filters", kept.len());
            kept
        }
        None => companies,
    };
    counts.filtered = companies.len();

    let t_enrich = Instant::now();
    println!("Enhancing {} companies...", companies.len());
    let enrich_opts = EnrichOptions {
        concurrency: settings.enrich_concurrency,
        timeout: settings.title_lookup_timeout(),
    };
    let companies: Vec<Company> = enrich::enrich_companies(companies, extractor, enrich_opts)
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(company) => company,
            Err(failure) => {
                warn!(company = failure.company.label(), "Error enhancing data: {}", failure.reason);
                counts.enrich_errors += 1;
                failure.company
            }
        })
        .collect();
    println!(
        "Enhanced in {:.1}s ({} errors)",
        t_enrich.elapsed().as_secs_f64(),
        counts.enrich_errors
    );

    let companies = match opts.ranking(settings) {
        Some(criteria) => {
            counts.ranked = !criteria.is_empty();
            rank::rank_leads(companies, &criteria)
        }
        None => companies,
    };

    info!("Generated {} leads", companies.len());
    (companies, counts)
}

/// Headline numbers for a finished run. Industries are compared trimmed and
/// lower-cased, since records whose enrichment failed keep their raw label.
#[derive(Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub top_industry: Option<String>,
    pub avg_score: Option<f64>,
    pub industries: usize,
}

impl Summary {
    pub fn from_leads(leads: &[Company], ranked: bool) -> Self {
        let keys: Vec<String> = leads
            .iter()
            .map(|l| l.industry().map_or_else(|| "unknown".to_string(), |i| i.trim().to_lowercase()))
            .collect();

        let mut per_industry: HashMap<&str, usize> = HashMap::new();
        for key in &keys {
            *per_industry.entry(key.as_str()).or_default() += 1;
        }
        // Highest count; first seen wins a tie
        let mut top: Option<(&str, usize)> = None;
        for key in &keys {
            let n = per_industry[key.as_str()];
            if top.map_or(true, |(_, best)| n > best) {
                top = Some((key.as_str(), n));
            }
        }

        let avg_score = (ranked && !leads.is_empty()).then(|| {
            let sum: u32 = leads.iter().map(|l| l.relevance_score.unwrap_or(0)).sum();
            sum as f64 / leads.len() as f64
        });

        Summary {
            total: leads.len(),
            top_industry: top.map(|(name, _)| capitalize(name)),
            avg_score,
            industries: per_industry.len(),
        }
    }

    pub fn print(&self) {
        println!("Total leads:  {}", self.total);
        if let Some(top) = &self.top_industry {
            println!("Top industry: {}", top);
        }
        match self.avg_score {
            Some(avg) => println!("Avg. score:   {:.1}", avg),
            None => println!("Industries:   {}", self.industries),
        }
    }
}
