//! Per-lead enrichment retry controller.
//!
//! Enrichment is modeled as an explicit state machine: a lead starts at
//! `Pending`, each research attempt produces an [`AttemptRecord`], and the
//! controller advances the state until it reaches a terminal `Enriched` or
//! `Failed`. Leads are enriched strictly one at a time; there is no internal
//! parallelism, which keeps the retry bound auditable.

use std::future::Future;
use std::time::Duration;

use crate::config_model::EnrichmentConfig;
use crate::errors::AppError;
use crate::models::Lead;

/// Phrases that mark a research response as low-information.
const LOW_INFORMATION_PHRASES: [&str; 7] = [
    "i don't have information",
    "i cannot find",
    "no information available",
    "unable to provide",
    "insufficient data",
    "i apologize",
    "error occurred",
];

const MIN_RESPONSE_LENGTH: usize = 100;
const MIN_UNIQUE_TOKEN_RATIO: f64 = 0.3;
const MIN_SENTENCE_COUNT: usize = 3;

/// The research collaborator: free text about a company/person, or an error.
///
/// Implementations must respect the passed timeout; a timeout is reported as
/// an ordinary error and treated as a retryable attempt failure.
pub trait ResearchProvider {
    fn research(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Enrichment state for one lead within one controller invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentState {
    Pending { attempts: u32 },
    Enriched { research: String, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl EnrichmentState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnrichmentState::Pending { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            EnrichmentState::Pending { attempts }
            | EnrichmentState::Enriched { attempts, .. }
            | EnrichmentState::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Outcome of a single research attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Accepted,
    Rejected(String),
}

/// Record of one attempt, kept for audit logging.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// Advance the state machine with the result of one research attempt.
///
/// `attempt_result` carries the accepted research text or the reason the
/// attempt failed (transport error or rejected content). The transition to
/// `Failed` happens only once `max_retries` attempts have been consumed.
pub fn advance(
    state: EnrichmentState,
    attempt_result: Result<String, String>,
    max_retries: u32,
) -> (EnrichmentState, AttemptRecord) {
    let attempts = state.attempts() + 1;
    match attempt_result {
        Ok(research) => (
            EnrichmentState::Enriched { research, attempts },
            AttemptRecord {
                attempt: attempts,
                outcome: AttemptOutcome::Accepted,
            },
        ),
        Err(error) => {
            let record = AttemptRecord {
                attempt: attempts,
                outcome: AttemptOutcome::Rejected(error.clone()),
            };
            let next = if attempts >= max_retries {
                EnrichmentState::Failed { error, attempts }
            } else {
                EnrichmentState::Pending { attempts }
            };
            (next, record)
        }
    }
}

/// Validate research content against the quality heuristics.
pub fn is_acceptable(text: &str) -> bool {
    if text.chars().count() < MIN_RESPONSE_LENGTH {
        return false;
    }

    let lowered = text.to_lowercase();
    if LOW_INFORMATION_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return false;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if !tokens.is_empty() {
        let unique: std::collections::HashSet<&str> = tokens.iter().copied().collect();
        if (unique.len() as f64) / (tokens.len() as f64) < MIN_UNIQUE_TOKEN_RATIO {
            return false;
        }
    }

    let sentences = text
        .split('.')
        .filter(|segment| !segment.trim().is_empty())
        .count();
    if sentences < MIN_SENTENCE_COUNT {
        return false;
    }

    true
}

/// Substitute the lead's fields into the prompt template.
pub fn build_prompt(template: &str, lead: &Lead) -> String {
    template
        .replace("{company}", &lead.company)
        .replace("{name}", &lead.name)
        .replace("{title}", lead.title.as_deref().unwrap_or(""))
}

/// Runs the bounded retry loop for one lead at a time.
pub struct EnrichmentRetryController<'a, P> {
    provider: &'a P,
    config: &'a EnrichmentConfig,
}

impl<'a, P: ResearchProvider> EnrichmentRetryController<'a, P> {
    pub fn new(provider: &'a P, config: &'a EnrichmentConfig) -> Self {
        Self { provider, config }
    }

    /// Enrich one lead, consuming at most `max_retries` attempts.
    ///
    /// A lead without a company terminates as `Failed` immediately, with no
    /// attempt consumed; the prompt template cannot be built without one.
    pub async fn run(&self, lead: &Lead) -> EnrichmentState {
        if lead.company.trim().is_empty() {
            tracing::warn!(
                "Lead {} has no company, enrichment cannot proceed",
                lead.email
            );
            return EnrichmentState::Failed {
                error: "Lead has no company to research".to_string(),
                attempts: 0,
            };
        }

        let prompt = build_prompt(&self.config.prompt_template, lead);
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        let mut state = EnrichmentState::Pending { attempts: 0 };
        while !state.is_terminal() {
            let attempt_result = match self.provider.research(&prompt, timeout).await {
                Ok(text) if is_acceptable(&text) => Ok(text),
                Ok(_) => Err("Research response failed content validation".to_string()),
                Err(e) => Err(e.to_string()),
            };

            let (next, record) = advance(state, attempt_result, self.config.max_retries);
            match &record.outcome {
                AttemptOutcome::Accepted => {
                    tracing::info!(
                        "Enriched lead {} on attempt {}",
                        lead.email,
                        record.attempt
                    );
                }
                AttemptOutcome::Rejected(reason) => {
                    tracing::warn!(
                        "Enrichment attempt {}/{} failed for {}: {}",
                        record.attempt,
                        self.config.max_retries,
                        lead.email,
                        reason
                    );
                }
            }
            state = next;
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_response_rejected_at_boundary() {
        let ninety_nine = "a".repeat(99);
        assert!(!is_acceptable(&ninety_nine));
    }

    #[test]
    fn plausible_hundred_char_response_accepted() {
        // Exactly 100 characters, three sentences, diverse tokens.
        let text = "Acme builds industrial tooling for mid-market firms. \
                    Revenue grew last year. They hire locally soon.";
        assert_eq!(text.chars().count(), 100);
        assert!(is_acceptable(text));
    }

    #[test]
    fn low_information_phrases_rejected() {
        let text = format!(
            "I apologize, but I was not able to locate details on this firm. {}",
            "Additional padding sentence here. And one more for length purposes."
        );
        assert!(text.len() >= 100);
        assert!(!is_acceptable(&text));
    }

    #[test]
    fn degenerate_repetition_rejected() {
        let text = "word word word word word word word word word word word word word \
                    word word word word word word word word word word word. ok. fine.";
        assert!(text.len() >= 100);
        assert!(!is_acceptable(text));
    }

    #[test]
    fn too_few_sentences_rejected() {
        let text = "This is a long response that goes on and on about the company without \
                    ever really pausing for structure at all";
        assert!(text.len() >= 100);
        assert!(!is_acceptable(text));
    }

    #[test]
    fn advance_terminates_after_max_retries() {
        let mut state = EnrichmentState::Pending { attempts: 0 };
        for _ in 0..3 {
            let (next, _) = advance(state, Err("nope".to_string()), 3);
            state = next;
        }
        assert_eq!(
            state,
            EnrichmentState::Failed {
                error: "nope".to_string(),
                attempts: 3
            }
        );
    }

    #[test]
    fn advance_accepts_midway() {
        let state = EnrichmentState::Pending { attempts: 1 };
        let (next, record) = advance(state, Ok("research".to_string()), 3);
        assert_eq!(record.attempt, 2);
        assert_eq!(record.outcome, AttemptOutcome::Accepted);
        assert!(matches!(next, EnrichmentState::Enriched { attempts: 2, .. }));
    }

    #[test]
    fn prompt_substitutes_lead_fields() {
        use crate::models::RawLead;
        let lead = Lead::from_candidate(
            RawLead {
                email: "jane@acme.com".to_string(),
                name: "Jane Doe".to_string(),
                company: "Acme".to_string(),
                title: Some("CTO".to_string()),
                source: "Apollo.io".to_string(),
                raw_data: serde_json::json!({}),
            },
            "proj",
        );
        let prompt = build_prompt("Company: {company}, Person: {name} ({title})", &lead);
        assert_eq!(prompt, "Company: Acme, Person: Jane Doe (CTO)");
    }
}
