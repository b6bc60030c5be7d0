use anyhow::Result;
use tracing::{info, warn};

use super::CompanySource;
use crate::company::Company;
use crate::markdown::{classify_lines, Block};
use crate::scraper::{Pacing, PageFetcher};

const EMPLOYEE_KEYS: &[&str] = &["Employees", "Employee Count", "Team Size", "Company Size", "Size"];

/// Scrapes a paginated company directory (`{base_url}/{industry}?page=N`).
pub struct DirectorySource {
    fetcher: PageFetcher,
    base_url: String,
    max_pages: usize,
    pacing: Pacing,
}

impl DirectorySource {
    pub fn new(fetcher: PageFetcher, base_url: &str, max_pages: usize, pacing: Pacing) -> Self {
        DirectorySource {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages,
            pacing,
        }
    }

    fn page_url(&self, industry: &str, page: usize) -> String {
        let slug = industry.trim().to_lowercase().replace(' ', "-");
        format!("{}/{}?page={}", self.base_url, slug, page)
    }
}

impl CompanySource for DirectorySource {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn fetch(&self, industry: &str, limit: usize) -> Result<Vec<Company>> {
        let mut companies = Vec::new();

        for page in 1..=self.max_pages {
            if page > 1 {
                self.pacing.wait().await;
            }
            let url = self.page_url(industry, page);
            let markdown = match self.fetcher.fetch_markdown(&url).await {
                Ok(md) => md,
                Err(e) => {
                    warn!("Error scraping page {}: {:#}", page, e);
                    continue;
                }
            };

            let cards = parse_listing(&markdown, industry);
            if cards.is_empty() {
                info!("No more company cards found on page {}", page);
                break;
            }
            companies.extend(cards);
            if companies.len() >= limit {
                companies.truncate(limit);
                break;
            }
        }

        Ok(companies)
    }
}

/// Company cards on one directory page.
///
/// A card opens at a level 2+ heading (the company name) and collects the first
/// external link as website, `Industry:` and headcount meta lines, and any free
/// text as description. Headings with neither a link nor meta are page chrome.
pub fn parse_listing(markdown: &str, industry: &str) -> Vec<Company> {
    let mut cards = Vec::new();
    let mut current: Option<Card> = None;

    for block in classify_lines(markdown) {
        match block {
            Block::Heading { level, text } if level >= 2 => {
                if let Some(card) = current.take() {
                    cards.extend(card.finish(industry));
                }
                current = Some(Card::new(text));
            }
            Block::Heading { .. } => {
                if let Some(card) = current.take() {
                    cards.extend(card.finish(industry));
                }
            }
            block => {
                if let Some(card) = current.as_mut() {
                    card.absorb(block);
                }
            }
        }
    }
    if let Some(card) = current {
        cards.extend(card.finish(industry));
    }

    cards
}

struct Card {
    name: String,
    website: Option<String>,
    industry: Option<String>,
    employee_count: Option<String>,
    description: Vec<String>,
}

impl Card {
    fn new(name: String) -> Self {
        Card {
            name,
            website: None,
            industry: None,
            employee_count: None,
            description: Vec::new(),
        }
    }

    fn absorb(&mut self, block: Block) {
        match block {
            Block::Link { url, .. } if self.website.is_none() && url.starts_with("http") => {
                self.website = Some(url);
            }
            Block::MetaField { key, value } if !value.is_empty() => {
                if key == "Industry" {
                    self.industry = Some(value);
                } else if EMPLOYEE_KEYS.contains(&key.as_str()) {
                    self.employee_count = Some(value);
                } else if key == "Website" && self.website.is_none() {
                    self.website = Some(value);
                }
            }
            Block::Text(t) => self.description.push(t),
            // A person line inside a card is just prose here
            Block::Person { name, title } => {
                self.description.push(name);
                self.description.push(title);
            }
            _ => {}
        }
    }

    fn finish(self, industry: &str) -> Option<Company> {
        if self.website.is_none() && self.industry.is_none() && self.employee_count.is_none() {
            return None;
        }
        let description = self.description.join(" ");
        Some(Company {
            name: Some(self.name),
            website: self.website,
            industry: Some(self.industry.unwrap_or_else(|| industry.to_string())),
            employee_count: self.employee_count,
            description: (!description.is_empty()).then_some(description),
            ..Default::default()
        })
    }
}
