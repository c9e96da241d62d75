//! Canonicalization of raw lead fields into deduplication keys.
//!
//! The normalized forms produced here are only ever used for equality
//! comparison; they are never displayed or persisted as the lead's own data.

use regex::Regex;
use std::sync::OnceLock;

/// Legal-entity suffixes stripped from company names, tried in this order.
const COMPANY_SUFFIXES: [&str; 8] = [
    "inc",
    "corp",
    "corporation",
    "llc",
    "ltd",
    "limited",
    "co",
    "company",
];

/// Normalize a company name into a comparison key.
///
/// Lowercases, trims, drops a leading `"the "` and trailing legal-entity
/// suffixes (` inc`, ` inc.`, `, inc`, `, inc.` and so on for each suffix,
/// first match wins per pass). Stripping repeats until the name is stable, so
/// the function is idempotent: normalizing an already-normalized name returns
/// it unchanged.
pub fn normalize_company(company_name: &str) -> String {
    if company_name.is_empty() {
        return String::new();
    }

    let mut normalized = company_name.to_lowercase().trim().to_string();
    loop {
        let next = strip_once(&normalized);
        if next == normalized {
            return normalized;
        }
        normalized = next;
    }
}

fn strip_once(name: &str) -> String {
    let mut stripped = name;

    if let Some(rest) = stripped.strip_prefix("the ") {
        stripped = rest;
    }

    'outer: for suffix in COMPANY_SUFFIXES {
        let patterns = [
            format!(" {}", suffix),
            format!(" {}.", suffix),
            format!(", {}", suffix),
            format!(", {}.", suffix),
        ];
        for pattern in &patterns {
            if let Some(rest) = stripped.strip_suffix(pattern.as_str()) {
                stripped = rest;
                break 'outer;
            }
        }
    }

    stripped.trim().to_string()
}

/// Normalize an email address into a comparison key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural email check, applied when parsing provider records and when
/// validating SMTP sender addresses.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid")
    });
    re.is_match(email.trim())
}
