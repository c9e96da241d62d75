/// End-to-end tests of the qualification pipeline over realistic batches.
use std::collections::HashSet;

use serde_json::json;

use rust_leadgen_api::config_model::LeadFilterConfig;
use rust_leadgen_api::dedup::DeduplicationIndex;
use rust_leadgen_api::filter::{filtering_stats, LeadFilterPipeline};
use rust_leadgen_api::models::{Lead, RawLead};

fn candidate(email: &str, name: &str, company: &str, size: Option<i64>) -> RawLead {
    let raw_data = match size {
        Some(n) => json!({"organization": {"name": company, "estimated_num_employees": n}}),
        None => json!({"organization": {"name": company}}),
    };
    RawLead {
        email: email.to_string(),
        name: name.to_string(),
        company: company.to_string(),
        title: None,
        source: "Apollo.io".to_string(),
        raw_data,
    }
}

#[test]
fn stages_run_in_order_and_first_failure_wins() {
    let blacklist: HashSet<String> = ["blocked@corp.com".to_string()].into();
    let pipeline = LeadFilterPipeline::new(LeadFilterConfig::default(), blacklist);
    let mut index = DeduplicationIndex::default();

    let batch = vec![
        candidate("", "No Email", "Emailless Co", None),
        candidate("blocked@corp.com", "Blocked Person", "Corp", None),
        candidate("jane@acme.com", "Jane Doe", "Acme", None),
        // Same company as Jane, dropped by one-person-per-company
        candidate("john@acme.com", "John Roe", "Acme", None),
        candidate("info@widgets.com", "Role Account", "Widgets", None),
        candidate("kim@kites.com", "Kim Lee", "Kite Co", None),
    ];

    let accepted = pipeline.apply(batch, &mut index);
    let emails: Vec<&str> = accepted.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(emails, vec!["jane@acme.com", "kim@kites.com"]);
}

#[test]
fn company_claim_happens_before_quality_rejection() {
    let pipeline = LeadFilterPipeline::new(LeadFilterConfig::default(), HashSet::new());
    let mut index = DeduplicationIndex::default();

    // The role account claims "widgets" in stage 3 even though stage 5 then
    // drops it, so the later candidate from the same company is a duplicate
    let accepted = pipeline.apply(
        vec![
            candidate("info@widgets.com", "Role Account", "Widgets", None),
            candidate("kim@widgets.com", "Kim Lee", "Widgets", None),
        ],
        &mut index,
    );
    assert!(accepted.is_empty());
    assert!(index.has_company("widgets"));
}

#[test]
fn company_dedup_ignores_suffix_and_case_variants() {
    let pipeline = LeadFilterPipeline::new(LeadFilterConfig::default(), HashSet::new());
    let mut index = DeduplicationIndex::default();

    let batch = vec![
        candidate("a@acme.com", "Ann One", "Acme Inc.", None),
        candidate("b@acme.com", "Bob Two", "ACME", None),
        candidate("c@acme.com", "Cat Three", "The Acme, LLC", None),
    ];

    let accepted = pipeline.apply(batch, &mut index);
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].email, "a@acme.com");
}

#[test]
fn company_size_bounds_only_reject_known_sizes() {
    let config = LeadFilterConfig {
        min_company_size: Some(10),
        max_company_size: Some(100),
        one_person_per_company: false,
        ..Default::default()
    };
    let pipeline = LeadFilterPipeline::new(config, HashSet::new());
    let mut index = DeduplicationIndex::default();

    let batch = vec![
        candidate("small@a.com", "Al Small", "Tiny Co", Some(5)),
        candidate("big@b.com", "Bo Big", "Huge Co", Some(5000)),
        candidate("fit@c.com", "Cy Fit", "Right Co", Some(50)),
        // No size data recoverable, must pass
        candidate("unknown@d.com", "Di Unknown", "Mystery Co", None),
    ];

    let accepted = pipeline.apply(batch, &mut index);
    let emails: Vec<&str> = accepted.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(emails, vec!["fit@c.com", "unknown@d.com"]);
}

#[test]
fn disabled_stages_are_skipped() {
    let config = LeadFilterConfig {
        require_email: false,
        exclude_blacklisted: false,
        one_person_per_company: false,
        min_company_size: None,
        max_company_size: None,
    };
    let blacklist: HashSet<String> = ["blocked@corp.com".to_string()].into();
    let pipeline = LeadFilterPipeline::new(config, blacklist);
    let mut index = DeduplicationIndex::default();

    let batch = vec![
        candidate("", "No Email", "Emailless Co", None),
        candidate("blocked@corp.com", "Blocked Person", "Corp", None),
        candidate("a@acme.com", "Ann One", "Acme", None),
        candidate("b@acme.com", "Bob Two", "Acme", None),
    ];

    // Quality heuristics still apply, everything else passes
    let accepted = pipeline.apply(batch, &mut index);
    assert_eq!(accepted.len(), 4);
}

#[test]
fn final_pass_drops_emails_already_persisted() {
    let pipeline = LeadFilterPipeline::new(LeadFilterConfig::default(), HashSet::new());

    let existing = vec![Lead::from_candidate(
        candidate("Jane@Acme.com", "Jane Doe", "Acme", None),
        "proj-1",
    )];
    let index = DeduplicationIndex::from_existing(&existing);

    let survivors = pipeline.remove_known_emails(
        vec![
            candidate("jane@acme.com", "Jane Doe", "Acme", None),
            candidate("kim@widgets.com", "Kim Lee", "Widgets", None),
        ],
        &index,
    );

    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].email, "kim@widgets.com");
}

#[test]
fn existing_leads_block_their_companies() {
    let existing = vec![Lead::from_candidate(
        candidate("jane@acme.com", "Jane Doe", "Acme Inc", None),
        "proj-1",
    )];
    let mut index = DeduplicationIndex::from_existing(&existing);

    let pipeline = LeadFilterPipeline::new(LeadFilterConfig::default(), HashSet::new());
    let accepted = pipeline.apply(
        vec![candidate("john@acme.com", "John Roe", "Acme", None)],
        &mut index,
    );
    assert!(accepted.is_empty());
}

#[test]
fn stats_describe_the_whole_run() {
    let stats = filtering_stats(40, 25, &LeadFilterConfig::default());
    assert_eq!(stats.filtered_out, 15);
    assert_eq!(stats.filter_rate_percent, 37.5);
    assert!(stats.filters_applied.one_person_per_company);
    assert!(!stats.filters_applied.company_size_filter);
}
