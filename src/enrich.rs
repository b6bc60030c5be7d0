use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tracing::{debug, info};

use crate::company::{Company, TitleMap, SOFTWARE_DEVELOPER};
use crate::titles::TitleExtractor;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("title extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("title extraction task failed: {0}")]
    Task(String),
}

/// A company whose enrichment failed, handed back as it was before the failure.
#[derive(Debug)]
pub struct EnrichFailure {
    pub company: Company,
    pub reason: EnrichError,
}

pub type EnrichOutcome = Result<Company, EnrichFailure>;

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub concurrency: usize,
    pub timeout: Duration,
}

/// Fill `job_titles` and normalise the text fields.
///
/// Only the discovered names survive; every title becomes "Software Developer".
/// With nothing discovered, two placeholder developers are synthesised.
pub fn apply_job_titles(company: &mut Company, discovered: TitleMap) {
    let titles: TitleMap = if discovered.is_empty() {
        let name = company.name.as_deref().unwrap_or("Company");
        (1..=2)
            .map(|i| (format!("Developer {} at {}", i, name), SOFTWARE_DEVELOPER.to_string()))
            .collect()
    } else {
        discovered
            .into_keys()
            .map(|person| (person, SOFTWARE_DEVELOPER.to_string()))
            .collect()
    };
    company.job_titles = Some(titles);

    if let Some(name) = company.name.as_mut() {
        *name = name.trim().to_string();
    }
    if let Some(industry) = company.industry.as_mut() {
        *industry = industry.trim().to_lowercase();
    }
}

/// Enrich every company, running up to `opts.concurrency` website lookups at
/// once. Outcomes come back in input order, one per company.
pub async fn enrich_companies<E>(
    companies: Vec<Company>,
    extractor: Arc<E>,
    opts: EnrichOptions,
) -> Vec<EnrichOutcome>
where
    E: TitleExtractor + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let total = companies.len();

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    // Spawn every lookup up front; the semaphore bounds how many run.
    let pending: Vec<(Company, Option<JoinHandle<Result<TitleMap, Elapsed>>>)> = companies
        .into_iter()
        .map(|company| {
            let handle = company.website().map(|website| {
                let website = website.to_string();
                let extractor = Arc::clone(&extractor);
                let sem = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await;
                    tokio::time::timeout(opts.timeout, extractor.extract_titles(&website)).await
                })
            });
            (company, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(total);
    for (mut company, handle) in pending {
        let discovered = match handle {
            None => Ok(TitleMap::new()),
            Some(handle) => match handle.await {
                Ok(Ok(titles)) => Ok(titles),
                Ok(Err(_)) => Err(EnrichError::Timeout(opts.timeout)),
                Err(e) => Err(EnrichError::Task(e.to_string())),
            },
        };

        let outcome = match discovered {
            Ok(titles) => {
                debug!(company = company.label(), "Discovered {} people", titles.len());
                apply_job_titles(&mut company, titles);
                Ok(company)
            }
            Err(reason) => Err(EnrichFailure { company, reason }),
        };
        outcomes.push(outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    info!("Enriched {} companies ({} ok, {} errors)", total, total - failed, failed);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::config::Settings;
    use crate::scraper::Pacing;
    use crate::titles::TEAM_PATHS;

    /// Canned answers keyed by website; unknown sites yield nothing.
    #[derive(Default)]
    struct StaticTitles {
        by_site: HashMap<String, TitleMap>,
        slow: Vec<String>,
        panics: Vec<String>,
    }

    impl StaticTitles {
        fn with(mut self, site: &str, people: &[(&str, &str)]) -> Self {
            let titles = people
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect();
            self.by_site.insert(site.to_string(), titles);
            self
        }
    }

    impl TitleExtractor for StaticTitles {
        async fn extract_titles(&self, website: &str) -> TitleMap {
            if self.slow.iter().any(|s| s == website) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.panics.iter().any(|s| s == website) {
                panic!("extractor blew up on {}", website);
            }
            self.by_site.get(website).cloned().unwrap_or_default()
        }
    }

    /// Walks every team page like the spider lookup, finding nobody.
    struct TeamPageWalk {
        page_load: Duration,
        pacing: Pacing,
        scale: u32,
    }

    impl TitleExtractor for TeamPageWalk {
        async fn extract_titles(&self, _website: &str) -> TitleMap {
            for i in 0..TEAM_PATHS.len() {
                if i > 0 {
                    tokio::time::sleep(self.pacing.sample() / self.scale).await;
                }
                tokio::time::sleep(self.page_load / self.scale).await;
            }
            TitleMap::new()
        }
    }

    fn company(name: &str, website: Option<&str>) -> Company {
        Company {
            name: Some(name.into()),
            website: website.map(Into::into),
            industry: Some("  Technology ".into()),
            ..Default::default()
        }
    }

    fn opts() -> EnrichOptions {
        EnrichOptions { concurrency: 3, timeout: Duration::from_millis(200) }
    }

    fn all_developers(c: &Company) -> bool {
        c.job_titles
            .as_ref()
            .is_some_and(|t| !t.is_empty() && t.values().all(|v| v == SOFTWARE_DEVELOPER))
    }

    #[test]
    fn discovered_titles_are_replaced() {
        let mut c = company("Acme", Some("https://acme.dev"));
        let mut found = TitleMap::new();
        found.insert("Alice".into(), "CEO".into());
        found.insert("Bob".into(), "CTO".into());
        apply_job_titles(&mut c, found);

        let titles = c.job_titles.unwrap();
        assert_eq!(titles.keys().collect::<Vec<_>>(), vec!["Alice", "Bob"]);
        assert!(titles.values().all(|v| v == SOFTWARE_DEVELOPER));
    }

    #[test]
    fn placeholders_use_company_name() {
        let mut c = company("  Acme  ", None);
        apply_job_titles(&mut c, TitleMap::new());
        let titles = c.job_titles.as_ref().unwrap();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains_key("Developer 1 at   Acme  "));
        assert!(titles.contains_key("Developer 2 at   Acme  "));
        assert_eq!(c.name.as_deref(), Some("Acme"));
        assert_eq!(c.industry.as_deref(), Some("technology"));
    }

    #[test]
    fn placeholders_fall_back_without_name() {
        let mut c = Company::default();
        apply_job_titles(&mut c, TitleMap::new());
        let titles = c.job_titles.unwrap();
        assert!(titles.contains_key("Developer 1 at Company"));
        assert!(titles.contains_key("Developer 2 at Company"));
        assert_eq!(c.industry, None);
    }

    #[tokio::test]
    async fn every_company_gets_developers_in_order() {
        let extractor = StaticTitles::default()
            .with("https://a.dev", &[("Ann", "CEO"), ("Al", "VP Sales")])
            .with("https://c.dev", &[("Cy", "Founder")]);
        let input = vec![
            company("A", Some("https://a.dev")),
            company("B", Some("https://b.dev")),
            company("C", Some("https://c.dev")),
            company("D", None),
            company("E", Some("")),
        ];

        let out = enrich_companies(input, Arc::new(extractor), opts()).await;
        let companies: Vec<Company> = out.into_iter().map(|o| o.unwrap()).collect();

        let names: Vec<_> = companies.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        assert!(companies.iter().all(all_developers));
        assert!(companies[0].job_titles.as_ref().unwrap().contains_key("Ann"));
        assert!(companies[1].job_titles.as_ref().unwrap().contains_key("Developer 1 at B"));
        assert_eq!(companies[2].job_titles.as_ref().unwrap().len(), 1);
        assert!(companies[4].job_titles.as_ref().unwrap().contains_key("Developer 2 at E"));
    }

    #[tokio::test]
    async fn default_budget_fits_a_full_team_page_walk() {
        // Real durations scaled down 100x: 5s page loads, default 2-5s pacing.
        let settings = Settings::default();
        let scale = 100;
        let walk = TeamPageWalk {
            page_load: Duration::from_secs(5),
            pacing: settings.pacing(),
            scale,
        };
        let opts = EnrichOptions {
            concurrency: 2,
            timeout: settings.title_lookup_timeout() / scale,
        };

        let input = vec![company("Quiet", Some("https://quiet.dev"))];
        let out = enrich_companies(input, Arc::new(walk), opts).await;

        let enriched = out.into_iter().next().unwrap().expect("walk should finish within budget");
        let titles = enriched.job_titles.unwrap();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains_key("Developer 1 at Quiet"));
        assert!(titles.contains_key("Developer 2 at Quiet"));
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch() {
        let extractor = StaticTitles {
            slow: vec!["https://slow.dev".into()],
            panics: vec!["https://boom.dev".into()],
            ..Default::default()
        };
        let input = vec![
            company("Slow", Some("https://slow.dev")),
            company("Boom", Some("https://boom.dev")),
            company("Fine", Some("https://fine.dev")),
        ];

        let out = enrich_companies(input, Arc::new(extractor), opts()).await;
        assert_eq!(out.len(), 3);
        match &out[0] {
            Err(f) => {
                assert!(matches!(f.reason, EnrichError::Timeout(_)));
                assert_eq!(f.company.name.as_deref(), Some("Slow"));
            }
            Ok(_) => panic!("expected timeout"),
        }
        match &out[1] {
            Err(f) => assert!(matches!(f.reason, EnrichError::Task(_))),
            Ok(_) => panic!("expected task failure"),
        }
        assert!(out[2].as_ref().is_ok_and(all_developers));
    }
}
