//! Batch-scoped deduplication index.
//!
//! Owned exclusively by one qualification run: seeded from the project's
//! persisted leads, then extended with claims as candidates are accepted, so a
//! claim made by an earlier candidate is visible to every later candidate in
//! the same batch.

use std::collections::HashSet;

use crate::models::Lead;
use crate::normalize::{normalize_company, normalize_email};

#[derive(Debug, Default)]
pub struct DeduplicationIndex {
    companies: HashSet<String>,
    emails: HashSet<String>,
}

impl DeduplicationIndex {
    /// Seed the index from the project's already-persisted leads.
    pub fn from_existing(existing: &[Lead]) -> Self {
        let mut index = Self::default();
        for lead in existing {
            let company_key = normalize_company(&lead.company);
            if !company_key.is_empty() {
                index.companies.insert(company_key);
            }
            if !lead.email.is_empty() {
                index.emails.insert(normalize_email(&lead.email));
            }
        }
        index
    }

    pub fn has_company(&self, key: &str) -> bool {
        self.companies.contains(key)
    }

    /// Idempotent insert of a company key.
    pub fn claim_company(&mut self, key: &str) {
        self.companies.insert(key.to_string());
    }

    pub fn has_email(&self, key: &str) -> bool {
        self.emails.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawLead;
    use serde_json::json;

    fn lead(email: &str, company: &str) -> Lead {
        Lead::from_candidate(
            RawLead {
                email: email.to_string(),
                name: "Someone".to_string(),
                company: company.to_string(),
                title: None,
                source: "Apollo.io".to_string(),
                raw_data: json!({}),
            },
            "proj",
        )
    }

    #[test]
    fn seeds_normalized_keys_from_existing_leads() {
        let index = DeduplicationIndex::from_existing(&[lead("Jane@Acme.com", "Acme Inc.")]);
        assert!(index.has_company("acme"));
        assert!(index.has_email("jane@acme.com"));
        assert!(!index.has_company("globex"));
    }

    #[test]
    fn claims_are_idempotent() {
        let mut index = DeduplicationIndex::default();
        assert!(!index.has_company("acme"));
        index.claim_company("acme");
        index.claim_company("acme");
        assert!(index.has_company("acme"));
    }

    #[test]
    fn leads_without_company_do_not_claim_the_empty_key() {
        let index = DeduplicationIndex::from_existing(&[lead("a@b.com", "")]);
        assert!(!index.has_company(""));
    }
}
