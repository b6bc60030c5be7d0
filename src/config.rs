use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::FilterConfig;
use crate::rank::RankingCriteria;
use crate::scraper::Pacing;
use crate::sources::SourceKind;
use crate::titles::TEAM_PATHS;

pub const DEFAULT_CONFIG_FILE: &str = "leads.toml";
const ENV_PREFIX: &str = "LEADS";

/// Everything the pipeline reads at runtime. Built once in `main` and passed down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub serpapi_key: Option<String>,
    pub spider_api_key: Option<String>,
    pub request_delay_min_secs: f64,
    pub request_delay_max_secs: f64,
    pub request_timeout_secs: u64,
    /// Budget for one company's whole team-page walk. Derived from the request
    /// timeout and pacing when unset.
    pub title_lookup_timeout_secs: Option<u64>,
    pub max_pages_per_search: usize,
    pub max_companies: usize,
    pub enrich_concurrency: usize,
    pub directory_url: String,
    pub results_dir: PathBuf,
    pub industries: Vec<String>,
    pub filters: FilterConfig,
    pub ranking: RankingCriteria,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            serpapi_key: None,
            spider_api_key: None,
            request_delay_min_secs: 2.0,
            request_delay_max_secs: 5.0,
            request_timeout_secs: 30,
            title_lookup_timeout_secs: None,
            max_pages_per_search: 5,
            max_companies: 100,
            enrich_concurrency: 4,
            directory_url: "https://example-directory.com/companies".to_string(),
            results_dir: PathBuf::from("results"),
            industries: vec!["technology".into(), "finance".into()],
            filters: FilterConfig {
                min_employees: Some(50),
                // empty: keep whichever industries the run collects
                industries: Vec::new(),
                exclude_keywords: vec!["bankrupt".into(), "closed".into(), "shutdown".into()],
            },
            ranking: RankingCriteria {
                industry: Some("technology".into()),
                min_employees: Some(100),
                max_employees: Some(1000),
                keywords: vec![
                    "innovation".into(),
                    "startup".into(),
                    "AI".into(),
                    "machine learning".into(),
                ],
            },
        }
    }
}

/// Problems that stop a run before any request is made.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no industries selected")]
    NoIndustries,
    #[error("the {kind:?} source needs `{key}` (config file or LEADS_{env})")]
    MissingKey {
        kind: SourceKind,
        key: &'static str,
        env: &'static str,
    },
}

impl Settings {
    /// Defaults, then the TOML file (optional unless given explicitly), then
    /// `LEADS_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if settings.spider_api_key.is_none() {
            settings.spider_api_key = std::env::var("SPIDER_API_KEY").ok();
        }
        Ok(settings)
    }

    pub fn validate(&self, kind: SourceKind, industries: &[String]) -> Result<(), ConfigError> {
        if industries.iter().all(|i| i.trim().is_empty()) {
            return Err(ConfigError::NoIndustries);
        }
        let missing = |key, env| ConfigError::MissingKey { kind, key, env };
        match kind {
            SourceKind::Search if blank(&self.serpapi_key) => Err(missing("serpapi_key", "SERPAPI_KEY")),
            SourceKind::Directory if blank(&self.spider_api_key) => {
                Err(missing("spider_api_key", "SPIDER_API_KEY"))
            }
            _ => Ok(()),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::new(self.request_delay_min_secs, self.request_delay_max_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// One request timeout plus the longest pacing delay for every team page tried.
    pub fn title_lookup_timeout(&self) -> Duration {
        match self.title_lookup_timeout_secs {
            Some(secs) => Duration::from_secs(secs.max(1)),
            None => (self.timeout() + self.pacing().max) * TEAM_PATHS.len() as u32,
        }
    }

    /// Copy safe to print: API keys replaced.
    pub fn masked(&self) -> Settings {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "********".to_string());
        Settings {
            serpapi_key: mask(&self.serpapi_key),
            spider_api_key: mask(&self.spider_api_key),
            ..self.clone()
        }
    }
}

fn blank(key: &Option<String>) -> bool {
    key.as_deref().map_or(true, |k| k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn industries(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
max_companies = 20
serpapi_key = "abc"

[filters]
min_employees = 10

[ranking]
industry = "finance"
keywords = ["payments"]
"#
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.max_companies, 20);
        assert_eq!(s.serpapi_key.as_deref(), Some("abc"));
        assert_eq!(s.filters.min_employees, Some(10));
        // untouched nested keys keep their defaults
        assert_eq!(s.filters.exclude_keywords, vec!["bankrupt", "closed", "shutdown"]);
        assert_eq!(s.ranking.industry.as_deref(), Some("finance"));
        assert_eq!(s.ranking.keywords, vec!["payments"]);
        assert_eq!(s.ranking.max_employees, Some(1000));
        assert_eq!(s.max_pages_per_search, 5);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("does/not/exist.toml"))).is_err());
    }

    #[test]
    fn validation() {
        let s = Settings::default();
        assert_eq!(s.validate(SourceKind::Sample, &[]), Err(ConfigError::NoIndustries));
        assert_eq!(s.validate(SourceKind::Sample, &industries(&[" "])), Err(ConfigError::NoIndustries));
        assert!(s.validate(SourceKind::Sample, &industries(&["tech"])).is_ok());
        assert!(matches!(
            s.validate(SourceKind::Search, &industries(&["tech"])),
            Err(ConfigError::MissingKey { key: "serpapi_key", .. })
        ));

        let s = Settings {
            serpapi_key: Some("k".into()),
            ..Settings::default()
        };
        assert!(s.validate(SourceKind::Search, &industries(&["tech"])).is_ok());
        assert!(matches!(
            s.validate(SourceKind::Directory, &industries(&["tech"])),
            Err(ConfigError::MissingKey { key: "spider_api_key", .. })
        ));
    }

    #[test]
    fn title_lookup_budget_covers_every_team_page() {
        let s = Settings::default();
        // 5 pages x (30s request + 5s pacing)
        assert_eq!(s.title_lookup_timeout(), Duration::from_secs(175));
        assert!(s.title_lookup_timeout() > s.timeout());

        let s = Settings {
            title_lookup_timeout_secs: Some(90),
            ..Settings::default()
        };
        assert_eq!(s.title_lookup_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn masked_hides_keys() {
        let s = Settings {
            serpapi_key: Some("secret".into()),
            ..Settings::default()
        };
        let m = s.masked();
        assert_eq!(m.serpapi_key.as_deref(), Some("********"));
        assert_eq!(m.spider_api_key, None);
        assert_eq!(m.max_companies, s.max_companies);
    }
}
