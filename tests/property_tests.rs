/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;

use rust_leadgen_api::dedup::DeduplicationIndex;
use rust_leadgen_api::enrichment::{advance, EnrichmentState};
use rust_leadgen_api::normalize::{is_valid_email, normalize_company, normalize_email};

// Property: normalization should never panic and always be idempotent
proptest! {
    #[test]
    fn company_normalization_never_panics(name in "\\PC*") {
        let _ = normalize_company(&name);
    }

    #[test]
    fn company_normalization_is_idempotent(name in "\\PC*") {
        let once = normalize_company(&name);
        let twice = normalize_company(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_companies_are_lowercase_and_trimmed(name in "\\PC*") {
        let normalized = normalize_company(&name);
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert!(!normalized.chars().any(|c| c.is_uppercase()));
    }

    #[test]
    fn email_normalization_is_idempotent(email in "\\PC*") {
        let once = normalize_email(&email);
        let twice = normalize_email(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn simple_emails_always_validate(
        local in "[a-z][a-z0-9]{0,10}",
        domain in "[a-z]{1,10}",
        tld in "[a-z]{2,4}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email));
    }
}

// Property: company claims are idempotent and visible to later checks
proptest! {
    #[test]
    fn claimed_companies_are_always_found(keys in proptest::collection::vec("[a-z ]{1,20}", 0..20)) {
        let mut index = DeduplicationIndex::default();
        for key in &keys {
            index.claim_company(key);
            prop_assert!(index.has_company(key));
        }
        for key in &keys {
            prop_assert!(index.has_company(key));
        }
    }
}

// Property: the retry state machine never exceeds its attempt budget
proptest! {
    #[test]
    fn attempts_never_exceed_max_retries(
        max_retries in 1u32..10,
        failures in 1usize..30
    ) {
        let mut state = EnrichmentState::Pending { attempts: 0 };
        for _ in 0..failures {
            if state.is_terminal() {
                break;
            }
            let (next, record) = advance(state, Err("failure".to_string()), max_retries);
            prop_assert!(record.attempt <= max_retries);
            state = next;
        }
        prop_assert!(state.attempts() <= max_retries);
        if failures >= max_retries as usize {
            prop_assert!(
                matches!(state, EnrichmentState::Failed { .. }),
                "expected EnrichmentState::Failed, got {:?}",
                state
            );
            prop_assert_eq!(state.attempts(), max_retries);
        }
    }

    #[test]
    fn success_is_always_terminal(prior_attempts in 0u32..9, max_retries in 1u32..10) {
        prop_assume!(prior_attempts < max_retries);
        let state = EnrichmentState::Pending { attempts: prior_attempts };
        let (next, _) = advance(state, Ok("research text".to_string()), max_retries);
        prop_assert!(next.is_terminal());
        prop_assert_eq!(next.attempts(), prior_attempts + 1);
    }
}
