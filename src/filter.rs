use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::company::Company;
use crate::employees::try_parse_employee_count;

/// Coarse criteria applied before enrichment. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_employees: Option<u64>,
    pub industries: Vec<String>,
    /// Case-insensitive substrings of the description that reject a company.
    /// Blank entries are ignored rather than matching every description.
    pub exclude_keywords: Vec<String>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.min_employees.unwrap_or(0) == 0
            && self.industries.is_empty()
            && keywords(&self.exclude_keywords).next().is_none()
    }

    /// Whether `company` survives all three checks. Missing fields never reject.
    pub fn accepts(&self, company: &Company) -> bool {
        if let (Some(min), Some(raw)) = (self.min_employees, company.employee_count()) {
            match try_parse_employee_count(raw) {
                Ok(count) if count < min => return false,
                Ok(_) => {}
                Err(e) => warn!(
                    company = company.label(),
                    "Keeping company with unreadable employee count '{}': {}",
                    raw,
                    e
                ),
            }
        }

        if let Some(industry) = company.industry() {
            if !self.industries.is_empty() {
                let industry = industry.to_lowercase();
                if !self.industries.iter().any(|i| i.to_lowercase() == industry) {
                    return false;
                }
            }
        }

        let description = company.description().to_lowercase();
        !keywords(&self.exclude_keywords).any(|kw| description.contains(&kw))
    }
}

/// Lower-cased, non-blank keywords.
pub(crate) fn keywords(list: &[String]) -> impl Iterator<Item = String> + '_ {
    list.iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
}

/// Drop companies failing `filters`, keeping relative order.
pub fn apply_pre_scraping_filters(companies: Vec<Company>, filters: &FilterConfig) -> Vec<Company> {
    if filters.is_empty() {
        return companies;
    }

    let before = companies.len();
    let kept: Vec<Company> = companies
        .into_iter()
        .filter(|c| {
            let ok = filters.accepts(c);
            if !ok {
                debug!(company = c.label(), "Filtered out");
            }
            ok
        })
        .collect();

    debug!("Pre-filter kept {} of {} companies", kept.len(), before);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(industry: Option<&str>, employees: Option<&str>, description: Option<&str>) -> Company {
        Company {
            name: Some("Acme".into()),
            industry: industry.map(Into::into),
            employee_count: employees.map(Into::into),
            description: description.map(Into::into),
            ..Default::default()
        }
    }

    fn filters() -> FilterConfig {
        FilterConfig {
            min_employees: Some(50),
            industries: vec!["Technology".into(), "finance".into()],
            exclude_keywords: vec!["bankrupt".into(), "Closed".into()],
        }
    }

    #[test]
    fn empty_config_is_identity() {
        let input = vec![
            company(Some("retail"), Some("1"), Some("closed forever")),
            company(None, Some("nonsense"), None),
        ];
        let out = apply_pre_scraping_filters(input.clone(), &FilterConfig::default());
        assert_eq!(out, input);
    }

    #[test]
    fn drops_small_companies() {
        let out = apply_pre_scraping_filters(
            vec![company(None, Some("10-20"), None), company(None, Some("50-100"), None)],
            &filters(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].employee_count.as_deref(), Some("50-100"));
    }

    #[test]
    fn industry_match_is_case_insensitive() {
        let out = apply_pre_scraping_filters(
            vec![
                company(Some("TECHNOLOGY"), None, None),
                company(Some("retail"), None, None),
                company(Some("Finance"), None, None),
            ],
            &filters(),
        );
        let industries: Vec<_> = out.iter().filter_map(|c| c.industry.as_deref()).collect();
        assert_eq!(industries, vec!["TECHNOLOGY", "Finance"]);
    }

    #[test]
    fn excluded_keywords_match_substrings() {
        let out = apply_pre_scraping_filters(
            vec![
                company(None, None, Some("Went BANKRUPT in 2020")),
                company(None, None, Some("Stores closed")),
                company(None, None, Some("Growing fast")),
            ],
            &filters(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description.as_deref(), Some("Growing fast"));
    }

    #[test]
    fn missing_fields_fail_open() {
        let input = vec![
            company(None, None, None),
            company(Some(""), Some(""), Some("")),
        ];
        let out = apply_pre_scraping_filters(input.clone(), &filters());
        assert_eq!(out, input);
    }

    #[test]
    fn unparseable_count_is_kept() {
        let out = apply_pre_scraping_filters(vec![company(None, Some("many"), None)], &filters());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn blank_exclude_keyword_is_ignored() {
        let cfg = FilterConfig {
            exclude_keywords: vec!["  ".into()],
            ..Default::default()
        };
        assert!(cfg.is_empty());

        let cfg = FilterConfig {
            exclude_keywords: vec!["".into(), "closed".into()],
            ..Default::default()
        };
        let out = apply_pre_scraping_filters(
            vec![company(None, None, Some("Hiring fast")), company(None, None, Some("Now closed"))],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description.as_deref(), Some("Hiring fast"));
    }
}
