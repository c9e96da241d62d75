use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::normalize::is_valid_email;

// ============ Lead Models ============

/// Outreach lifecycle status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Emailed,
    Responded,
    Bounced,
    Blacklisted,
}

/// Terminal (or in-flight) enrichment status of a lead.
///
/// A lead that has never been considered for enrichment carries no status at
/// all (`None` on [`Lead::enrichment_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    Pending,
    Enriched,
    Failed,
}

/// Which subject the research prompt should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentType {
    Company,
    Person,
    Both,
}

impl Default for EnrichmentType {
    fn default() -> Self {
        EnrichmentType::Both
    }
}

/// A qualified outreach contact as persisted in the `leads` collection.
///
/// Field names follow the store's document schema (camelCase, except the
/// provider payload which has always been stored as `raw_data`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: Option<String>,
    pub project_id: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub enrichment_status: Option<EnrichmentStatus>,
    #[serde(default)]
    pub enrichment_type: Option<EnrichmentType>,
    #[serde(default)]
    pub enrichment_data: Option<String>,
    #[serde(default)]
    pub enrichment_error: Option<String>,
    #[serde(default)]
    pub enrichment_attempts: u32,
    #[serde(default)]
    pub last_enrichment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followup_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_contacted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    /// Raw provider record, kept to recover structured fields (employee
    /// counts, ranges) that the normalized lead drops.
    #[serde(rename = "raw_data", default)]
    pub raw_data: Option<Value>,
}

impl Lead {
    /// Build a fresh lead from an accepted candidate.
    pub fn from_candidate(candidate: RawLead, project_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: candidate.email,
            name: candidate.name,
            company: candidate.company,
            title: candidate.title,
            project_id: project_id.to_string(),
            status: LeadStatus::New,
            enrichment_status: None,
            enrichment_type: None,
            enrichment_data: None,
            enrichment_error: None,
            enrichment_attempts: 0,
            last_enrichment_date: None,
            followup_count: 0,
            created_at: Utc::now(),
            last_contacted: None,
            source: candidate.source,
            raw_data: Some(candidate.raw_data),
        }
    }
}

/// A candidate record from the search provider, before qualification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLead {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: String,
    /// Full provider record as returned by the search API.
    #[serde(default)]
    pub raw_data: Value,
}

impl RawLead {
    /// Parse one provider "person" record into a candidate.
    ///
    /// Records with a missing or structurally invalid email are dropped here,
    /// before any filter stage runs.
    pub fn from_provider_person(person: &Value) -> Option<Self> {
        let email = person.get("email").and_then(|v| v.as_str()).unwrap_or("");
        if !is_valid_email(email) {
            tracing::warn!(
                "Skipping provider record with invalid email: {:?}",
                person.get("id").and_then(|v| v.as_str()).unwrap_or("?")
            );
            return None;
        }

        let name = person
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let company = person
            .get("organization")
            .and_then(|o| o.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        let title = person
            .get("title")
            .and_then(|v| v.as_str())
            .map(|t| t.to_string());

        Some(Self {
            email: email.trim().to_lowercase(),
            name,
            company,
            title,
            source: "Apollo.io".to_string(),
            raw_data: person.clone(),
        })
    }
}

// ============ Filter Statistics ============

/// Which filter stages were active for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FiltersApplied {
    pub require_email: bool,
    pub exclude_blacklisted: bool,
    pub one_person_per_company: bool,
    pub company_size_filter: bool,
}

/// Summary of one filtering run, returned to callers alongside the counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub filtered_count: usize,
    pub filtered_out: usize,
    pub filter_rate_percent: f64,
    pub filters_applied: FiltersApplied,
}

// ============ API Request/Response Models ============

/// Request payload for the find-leads operation.
#[derive(Debug, Default, Deserialize)]
pub struct FindLeadsRequest {
    /// How many candidates to request from the search provider.
    #[serde(default)]
    pub num_leads: Option<u32>,
}

/// Response payload for the find-leads operation.
///
/// Counts are always present, even on partial failure, so callers can tell
/// "nothing matched" apart from "everything failed".
#[derive(Debug, Serialize)]
pub struct FindLeadsResponse {
    pub success: bool,
    pub message: String,
    pub project_id: String,
    pub leads_found: usize,
    pub leads_added: usize,
    pub duplicates_filtered: usize,
    pub stats: FilterStats,
}

/// Request payload for the enrich-leads operation.
#[derive(Debug, Default, Deserialize)]
pub struct EnrichLeadsRequest {
    /// Specific leads to enrich. Empty means "all leads needing enrichment".
    #[serde(default)]
    pub lead_ids: Vec<Uuid>,
    /// Re-run enrichment even for leads that already carry a terminal status.
    #[serde(default)]
    pub force_re_enrich: bool,
    #[serde(default)]
    pub enrichment_type: EnrichmentType,
}

/// Response payload for the enrich-leads operation.
#[derive(Debug, Serialize)]
pub struct EnrichLeadsResponse {
    pub success: bool,
    pub message: String,
    pub project_id: String,
    pub leads_processed: usize,
    pub leads_enriched: usize,
    pub leads_failed: usize,
}

/// Per-project enrichment progress summary.
#[derive(Debug, Serialize)]
pub struct EnrichmentStatusResponse {
    pub success: bool,
    pub project_id: String,
    pub total_leads: usize,
    pub enriched_leads: usize,
    pub failed_leads: usize,
    pub pending_leads: usize,
    pub enrichment_percentage: f64,
}
