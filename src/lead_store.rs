//! Lead, project and blacklist persistence on top of [`DocStore`].

use std::collections::HashSet;

use serde_json::Value;
use uuid::Uuid;

use crate::doc_store::{DocStore, DocWrite};
use crate::errors::AppError;
use crate::models::Lead;
use crate::normalize::normalize_email;

const LEADS: &str = "leads";
const PROJECTS: &str = "projects";
const BLACKLIST: &str = "blacklist";

#[derive(Clone)]
pub struct LeadStore {
    docs: DocStore,
}

impl LeadStore {
    pub fn new(docs: DocStore) -> Self {
        Self { docs }
    }

    /// All leads belonging to a project.
    ///
    /// Malformed documents are skipped with a warning rather than failing the
    /// whole query.
    pub async fn leads_for_project(&self, project_id: &str) -> Result<Vec<Lead>, AppError> {
        let docs = self.docs.query_eq(LEADS, "projectId", project_id).await?;

        let mut leads = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match serde_json::from_value::<Lead>(doc) {
                Ok(lead) => leads.push(lead),
                Err(e) => tracing::warn!("Skipping malformed lead document {}: {}", id, e),
            }
        }
        Ok(leads)
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        match self.docs.get(LEADS, &id.to_string()).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(|e| {
                AppError::InternalError(format!("Malformed lead document {}: {}", id, e))
            })?)),
            None => Ok(None),
        }
    }

    /// Persist a batch of leads in one transaction.
    pub async fn write_leads(&self, leads: &[Lead]) -> Result<(), AppError> {
        let writes = leads
            .iter()
            .map(|lead| {
                Ok(DocWrite::new(
                    LEADS,
                    lead.id.to_string(),
                    serde_json::to_value(lead).map_err(|e| {
                        AppError::InternalError(format!("Failed to serialize lead: {}", e))
                    })?,
                ))
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        self.docs.batch_write(writes).await
    }

    /// Union of the global blacklist and the project's blacklist, normalized
    /// to lowercase.
    pub async fn blacklisted_emails(
        &self,
        project_id: &str,
    ) -> Result<HashSet<String>, AppError> {
        let mut emails = HashSet::new();
        for id in ["global".to_string(), format!("project_{}", project_id)] {
            if let Some(doc) = self.docs.get(BLACKLIST, &id).await? {
                if let Some(list) = doc.get("emails").and_then(|v| v.as_array()) {
                    emails.extend(
                        list.iter()
                            .filter_map(|v| v.as_str())
                            .map(normalize_email),
                    );
                }
            }
        }
        Ok(emails)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Value>, AppError> {
        self.docs.get(PROJECTS, project_id).await
    }

    /// Add to the project's lead counter, creating the document if the
    /// project record does not track one yet.
    pub async fn bump_lead_count(&self, project_id: &str, added: usize) -> Result<(), AppError> {
        let mut doc = self
            .docs
            .get(PROJECTS, project_id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        let current = doc.get("leadCount").and_then(|v| v.as_u64()).unwrap_or(0);
        doc["leadCount"] = Value::from(current + added as u64);
        self.docs.put(PROJECTS, project_id, doc).await
    }

    /// Record the outcome of an enrichment run on the project document.
    /// Best-effort bookkeeping, callers may ignore failures here.
    pub async fn record_enrichment_run(
        &self,
        project_id: &str,
        enriched: usize,
        failed: usize,
    ) -> Result<(), AppError> {
        let mut doc = self
            .docs
            .get(PROJECTS, project_id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        doc["lastEnrichmentRun"] = serde_json::json!({
            "enriched": enriched,
            "failed": failed,
            "at": chrono::Utc::now(),
        });
        self.docs.put(PROJECTS, project_id, doc).await
    }
}
