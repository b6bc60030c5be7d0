use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::company::Company;
use crate::employees::parse_employee_count;
use crate::filter::keywords;

const INDUSTRY_WEIGHT: u32 = 30;
const SIZE_WEIGHT: u32 = 20;
const KEYWORD_WEIGHT: u32 = 5;
const TITLE_WEIGHT: u32 = 2;
const TITLE_CAP: u32 = 10;

/// Target profile used to score leads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingCriteria {
    pub industry: Option<String>,
    pub min_employees: Option<u64>,
    pub max_employees: Option<u64>,
    /// Each keyword found in the description adds to the score. Blank entries
    /// are ignored rather than matching every description.
    pub keywords: Vec<String>,
}

impl RankingCriteria {
    pub fn is_empty(&self) -> bool {
        self.industry.as_deref().map_or(true, |i| i.trim().is_empty())
            && self.min_employees.is_none()
            && self.max_employees.is_none()
            && keywords(&self.keywords).next().is_none()
    }

    pub fn score(&self, company: &Company) -> u32 {
        let mut score = 0;

        if let (Some(target), Some(industry)) = (self.industry.as_deref(), company.industry()) {
            if !target.is_empty() && industry.to_lowercase() == target.to_lowercase() {
                score += INDUSTRY_WEIGHT;
            }
        }

        if let Some(raw) = company.employee_count() {
            let count = parse_employee_count(raw);
            let min = self.min_employees.unwrap_or(0);
            let max = self.max_employees.unwrap_or(u64::MAX);
            if (min..=max).contains(&count) {
                score += SIZE_WEIGHT;
            }
        }

        let description = company.description().to_lowercase();
        if !description.is_empty() {
            let hits = keywords(&self.keywords)
                .filter(|kw| description.contains(kw.as_str()))
                .count() as u32;
            score += hits * KEYWORD_WEIGHT;
        }

        if let Some(titles) = company.job_titles.as_ref().filter(|t| !t.is_empty()) {
            score += (titles.len() as u32 * TITLE_WEIGHT).min(TITLE_CAP);
        }

        score
    }
}

/// Score every company and sort by descending score. Equal scores keep their
/// input order. Empty criteria return the input untouched and unscored.
pub fn rank_leads(mut companies: Vec<Company>, criteria: &RankingCriteria) -> Vec<Company> {
    if criteria.is_empty() {
        return companies;
    }

    companies
        .par_iter_mut()
        .for_each(|c| c.relevance_score = Some(criteria.score(c)));

    // sort_by_key is stable
    companies.sort_by_key(|c| std::cmp::Reverse(c.relevance_score.unwrap_or(0)));
    companies
}
