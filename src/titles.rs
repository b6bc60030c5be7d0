use std::future::Future;

use tracing::{debug, info, warn};

use crate::company::TitleMap;
use crate::markdown::{classify_lines, Block};
use crate::scraper::{Pacing, PageFetcher};

/// Pages where teams and leadership are usually listed, in lookup order.
pub const TEAM_PATHS: &[&str] = &["/about", "/team", "/leadership", "/company", ""];

/// Looks up the people listed on a company website.
///
/// Implementations never fail: anything that goes wrong yields an empty map.
pub trait TitleExtractor {
    fn extract_titles(&self, website: &str) -> impl Future<Output = TitleMap> + Send;
}

/// Crawls a handful of well-known team pages through spider.cloud.
pub struct SpiderTitleExtractor {
    fetcher: PageFetcher,
    pacing: Pacing,
}

impl SpiderTitleExtractor {
    pub fn new(fetcher: PageFetcher, pacing: Pacing) -> Self {
        SpiderTitleExtractor { fetcher, pacing }
    }
}

impl TitleExtractor for SpiderTitleExtractor {
    async fn extract_titles(&self, website: &str) -> TitleMap {
        for (i, path) in TEAM_PATHS.iter().enumerate() {
            if i > 0 {
                self.pacing.wait().await;
            }
            let url = join_path(website, path);
            match self.fetcher.fetch_markdown(&url).await {
                Ok(md) => {
                    let titles = titles_from_markdown(&md);
                    if !titles.is_empty() {
                        info!("Found {} people on {}", titles.len(), url);
                        return titles;
                    }
                    debug!("No people listed on {}", url);
                }
                Err(e) => warn!("Error extracting job titles from {}: {}", url, e),
            }
        }
        TitleMap::new()
    }
}

/// Title lookup chosen at startup: spider.cloud when a key is configured,
/// otherwise nothing is fetched and every company gets placeholders.
pub enum TitleLookup {
    Spider(SpiderTitleExtractor),
    Offline,
}

impl TitleExtractor for TitleLookup {
    async fn extract_titles(&self, website: &str) -> TitleMap {
        match self {
            TitleLookup::Spider(spider) => spider.extract_titles(website).await,
            TitleLookup::Offline => TitleMap::new(),
        }
    }
}

/// Name → title for every person block on the page.
pub fn titles_from_markdown(markdown: &str) -> TitleMap {
    classify_lines(markdown)
        .into_iter()
        .filter_map(|b| match b {
            Block::Person { name, title } => Some((name, title)),
            _ => None,
        })
        .collect()
}

fn join_path(website: &str, path: &str) -> String {
    format!("{}{}", website.trim_end_matches('/'), path)
}
