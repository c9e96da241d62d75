//! Lead qualification pipeline.
//!
//! Stages run in a fixed order per candidate; the first failing stage drops
//! the candidate and skips the rest. After the pipeline a final pass removes
//! candidates whose normalized email already exists among persisted leads,
//! independent of the company-level check.

use serde_json::Value;
use std::collections::HashSet;

use crate::config_model::LeadFilterConfig;
use crate::dedup::DeduplicationIndex;
use crate::models::{FilterStats, FiltersApplied, RawLead};
use crate::normalize::{normalize_company, normalize_email};

/// Role-account local parts that never belong to a person.
const GENERIC_EMAIL_PREFIXES: [&str; 12] = [
    "info@",
    "contact@",
    "support@",
    "help@",
    "sales@",
    "admin@",
    "webmaster@",
    "postmaster@",
    "noreply@",
    "no-reply@",
    "donotreply@",
    "marketing@",
];

const DISPOSABLE_DOMAINS: [&str; 5] = [
    "10minutemail.com",
    "guerrillamail.com",
    "tempmail.org",
    "mailinator.com",
    "dispostable.com",
];

const PLACEHOLDER_NAMES: [&str; 6] = ["test", "demo", "sample", "example", "admin", "user"];

/// Ordered filter stages over one batch of candidates.
pub struct LeadFilterPipeline {
    config: LeadFilterConfig,
    blacklist: HashSet<String>,
}

impl LeadFilterPipeline {
    pub fn new(config: LeadFilterConfig, blacklist: HashSet<String>) -> Self {
        Self { config, blacklist }
    }

    /// Run every stage over the candidates, claiming company keys in `index`
    /// as candidates are accepted.
    pub fn apply(
        &self,
        candidates: Vec<RawLead>,
        index: &mut DeduplicationIndex,
    ) -> Vec<RawLead> {
        let mut accepted = Vec::new();

        for candidate in candidates {
            // Stage 1: email requirement
            if self.config.require_email && candidate.email.is_empty() {
                tracing::debug!("Filtered lead without email: {}", candidate.name);
                continue;
            }

            // Stage 2: blacklist
            if self.config.exclude_blacklisted
                && !candidate.email.is_empty()
                && self.blacklist.contains(&normalize_email(&candidate.email))
            {
                tracing::debug!("Filtered blacklisted email: {}", candidate.email);
                continue;
            }

            // Stage 3: one person per company
            if self.config.one_person_per_company && !candidate.company.is_empty() {
                let company_key = normalize_company(&candidate.company);
                if index.has_company(&company_key) {
                    tracing::debug!("Filtered duplicate company: {}", candidate.company);
                    continue;
                }
                index.claim_company(&company_key);
            }

            // Stage 4: company size range
            if self.filtered_by_company_size(&candidate) {
                tracing::debug!("Filtered by company size: {}", candidate.company);
                continue;
            }

            // Stage 5: quality heuristics
            if !passes_quality_filters(&candidate) {
                tracing::debug!("Filtered by quality checks: {}", candidate.email);
                continue;
            }

            accepted.push(candidate);
        }

        accepted
    }

    /// Final cross-batch duplicate pass: drop any candidate whose normalized
    /// email matches a persisted lead's email.
    pub fn remove_known_emails(
        &self,
        candidates: Vec<RawLead>,
        index: &DeduplicationIndex,
    ) -> Vec<RawLead> {
        candidates
            .into_iter()
            .filter(|candidate| {
                let duplicate = index.has_email(&normalize_email(&candidate.email));
                if duplicate {
                    tracing::info!("Duplicate lead found: {}", candidate.email);
                }
                !duplicate
            })
            .collect()
    }

    /// True when a size bound is configured, a size could be recovered from
    /// the raw provider payload, and the size falls outside the bounds.
    /// Absence of size data is never a rejection reason.
    fn filtered_by_company_size(&self, candidate: &RawLead) -> bool {
        if self.config.min_company_size.is_none() && self.config.max_company_size.is_none() {
            return false;
        }

        let Some(size) = company_size_from_raw(&candidate.raw_data) else {
            return false;
        };

        if let Some(min) = self.config.min_company_size {
            if size < min as i64 {
                return true;
            }
        }
        if let Some(max) = self.config.max_company_size {
            if size > max as i64 {
                return true;
            }
        }
        false
    }
}

/// Recover an employee count from the provider's organization payload.
///
/// Prefers the explicit numeric estimate; otherwise takes the lower bound of
/// the first textual range (`"11-50"` yields 11).
pub fn company_size_from_raw(raw: &Value) -> Option<i64> {
    let organization = raw.get("organization")?;

    if let Some(size) = organization
        .get("estimated_num_employees")
        .and_then(|v| v.as_i64())
    {
        return Some(size);
    }

    let range = organization
        .get("num_employees_ranges")
        .and_then(|v| v.as_array())
        .and_then(|ranges| ranges.first())
        .and_then(|v| v.as_str())?;

    range.split('-').next()?.trim().parse::<i64>().ok()
}

/// Basic quality heuristics on email and name.
fn passes_quality_filters(candidate: &RawLead) -> bool {
    let email = candidate.email.to_lowercase();

    if GENERIC_EMAIL_PREFIXES
        .iter()
        .any(|prefix| email.starts_with(prefix))
    {
        return false;
    }

    let domain = email.rsplit('@').next().unwrap_or("");
    if email.contains('@') && DISPOSABLE_DOMAINS.contains(&domain) {
        return false;
    }

    let name = candidate.name.trim();
    if !name.is_empty() {
        if name.chars().count() < 2 {
            return false;
        }
        if PLACEHOLDER_NAMES.contains(&name.to_lowercase().as_str()) {
            return false;
        }
        let tokens: Vec<&str> = name.split_whitespace().collect();
        if tokens.len() == 1 && name.chars().count() < 3 {
            return false;
        }
    }

    true
}

/// Summarize one filtering run.
pub fn filtering_stats(
    original_count: usize,
    filtered_count: usize,
    config: &LeadFilterConfig,
) -> FilterStats {
    let filtered_out = original_count.saturating_sub(filtered_count);
    let filter_rate = if original_count > 0 {
        filtered_out as f64 / original_count as f64 * 100.0
    } else {
        0.0
    };

    FilterStats {
        original_count,
        filtered_count,
        filtered_out,
        filter_rate_percent: (filter_rate * 100.0).round() / 100.0,
        filters_applied: FiltersApplied {
            require_email: config.require_email,
            exclude_blacklisted: config.exclude_blacklisted,
            one_person_per_company: config.one_person_per_company,
            company_size_filter: config.min_company_size.is_some()
                || config.max_company_size.is_some(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(email: &str, name: &str, company: &str) -> RawLead {
        RawLead {
            email: email.to_string(),
            name: name.to_string(),
            company: company.to_string(),
            title: None,
            source: "Apollo.io".to_string(),
            raw_data: json!({}),
        }
    }

    #[test]
    fn company_size_prefers_explicit_estimate() {
        let raw = json!({
            "organization": {
                "estimated_num_employees": 120,
                "num_employees_ranges": ["11-50"]
            }
        });
        assert_eq!(company_size_from_raw(&raw), Some(120));
    }

    #[test]
    fn company_size_falls_back_to_range_lower_bound() {
        let raw = json!({"organization": {"num_employees_ranges": ["11-50", "51-200"]}});
        assert_eq!(company_size_from_raw(&raw), Some(11));
    }

    #[test]
    fn company_size_missing_is_none() {
        assert_eq!(company_size_from_raw(&json!({})), None);
        assert_eq!(
            company_size_from_raw(&json!({"organization": {"num_employees_ranges": ["many"]}})),
            None
        );
    }

    #[test]
    fn generic_prefix_always_rejected() {
        assert!(!passes_quality_filters(&candidate(
            "info@foo.com",
            "Jane Doe",
            "Foo"
        )));
        assert!(passes_quality_filters(&candidate(
            "jane@foo.com",
            "Jane Doe",
            "Foo"
        )));
    }

    #[test]
    fn placeholder_and_short_names_rejected() {
        assert!(!passes_quality_filters(&candidate("a@b.com", "Test", "X")));
        assert!(!passes_quality_filters(&candidate("a@b.com", "J", "X")));
        assert!(!passes_quality_filters(&candidate("a@b.com", "Jo", "X")));
        // Two short tokens are fine, single long token is fine
        assert!(passes_quality_filters(&candidate("a@b.com", "Jo Li", "X")));
        assert!(passes_quality_filters(&candidate("a@b.com", "Jon", "X")));
        // Missing name is not a quality failure
        assert!(passes_quality_filters(&candidate("a@b.com", "", "X")));
    }

    #[test]
    fn disposable_domains_rejected() {
        assert!(!passes_quality_filters(&candidate(
            "jane@mailinator.com",
            "Jane Doe",
            "X"
        )));
    }

    #[test]
    fn stats_report_rate_and_applied_filters() {
        let config = LeadFilterConfig {
            min_company_size: Some(10),
            ..Default::default()
        };
        let stats = filtering_stats(8, 6, &config);
        assert_eq!(stats.original_count, 8);
        assert_eq!(stats.filtered_count, 6);
        assert_eq!(stats.filtered_out, 2);
        assert_eq!(stats.filter_rate_percent, 25.0);
        assert!(stats.filters_applied.company_size_filter);
        assert!(stats.filters_applied.require_email);
    }

    #[test]
    fn stats_with_empty_batch() {
        let stats = filtering_stats(0, 0, &LeadFilterConfig::default());
        assert_eq!(stats.filter_rate_percent, 0.0);
    }
}
