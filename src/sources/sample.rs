use anyhow::Result;

use super::CompanySource;
use crate::company::{capitalize, Company};

/// Offline stand-in for a directory: predictable companies for every industry.
pub struct SampleSource;

impl CompanySource for SampleSource {
    fn name(&self) -> &'static str {
        "sample"
    }

    async fn fetch(&self, industry: &str, limit: usize) -> Result<Vec<Company>> {
        Ok((0..limit).map(|j| sample_company(industry, j)).collect())
    }
}

fn sample_company(industry: &str, j: usize) -> Company {
    let slug: String = industry.split_whitespace().collect();
    Company {
        name: Some(format!("{} Company {}", capitalize(industry), j)),
        website: Some(format!("https://www.{}company{}.com", slug, j)),
        industry: Some(industry.to_string()),
        employee_count: Some(format!("{}-{}", (j + 1) * 50, (j + 1) * 100)),
        description: Some(format!(
            "A leading {} company specializing in innovative solutions.",
            industry
        )),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generates_requested_count() {
        let companies = SampleSource.fetch("finance", 3).await.unwrap();
        assert_eq!(companies.len(), 3);

        let second = &companies[1];
        assert_eq!(second.name.as_deref(), Some("Finance Company 1"));
        assert_eq!(second.website.as_deref(), Some("https://www.financecompany1.com"));
        assert_eq!(second.employee_count.as_deref(), Some("100-200"));
        assert_eq!(second.industry.as_deref(), Some("finance"));
    }
}
