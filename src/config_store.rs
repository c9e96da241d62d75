//! Synchronization between the typed configuration model and the document
//! store.
//!
//! Each domain is persisted as its own settings document; absent documents
//! resolve to in-memory defaults (lazy creation on first read, never an
//! error). Documents are deserialized into the typed structs of
//! `config_model` right here at the store boundary, with defaulting for
//! absent fields done by serde.

use serde::Deserialize;
use serde_json::Value;

use crate::config_model::{
    ApiKeysConfig, EmailGenerationConfig, EnrichmentConfig, GlobalConfig, JobRole,
    JobRolesConfig, LeadFilterConfig, LocationConfig, ProjectConfig, SchedulingConfig,
    SmtpConfig,
};
use crate::doc_store::{DocStore, DocWrite};
use crate::errors::AppError;

const SETTINGS: &str = "settings";

/// Partial update for the global configuration; only supplied domains are
/// replaced (whole-domain replacement, validated before the write).
#[derive(Debug, Default, Deserialize)]
pub struct GlobalConfigUpdate {
    pub smtp: Option<SmtpConfig>,
    pub api_keys: Option<ApiKeysConfig>,
    pub lead_filter: Option<LeadFilterConfig>,
    pub job_roles: Option<JobRolesConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub email_generation: Option<EmailGenerationConfig>,
    pub scheduling: Option<SchedulingConfig>,
}

/// Partial update for a project configuration.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfigUpdate {
    pub location: Option<LocationConfig>,
    pub use_global_lead_filter: Option<bool>,
    pub use_global_job_roles: Option<bool>,
    pub use_global_enrichment: Option<bool>,
    pub use_global_email_generation: Option<bool>,
    pub use_global_scheduling: Option<bool>,
    pub lead_filter: Option<LeadFilterConfig>,
    pub job_roles: Option<JobRolesConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub email_generation: Option<EmailGenerationConfig>,
    pub scheduling: Option<SchedulingConfig>,
}

/// Loads and persists the two-tier configuration model.
///
/// Constructed once in application state and passed explicitly; there is no
/// process-wide singleton.
#[derive(Clone)]
pub struct ConfigStore {
    docs: DocStore,
}

impl ConfigStore {
    pub fn new(docs: DocStore) -> Self {
        Self { docs }
    }

    /// Load the organization-wide configuration, falling back to defaults for
    /// any missing domain document.
    pub async fn load_global(&self) -> Result<GlobalConfig, AppError> {
        Ok(GlobalConfig {
            smtp: self.load_domain(SETTINGS, "smtp").await?,
            api_keys: self.load_domain(SETTINGS, "api_keys").await?,
            lead_filter: self.load_domain(SETTINGS, "lead_filter").await?,
            job_roles: self.load_job_roles(SETTINGS, "job_roles").await?,
            enrichment: self.load_domain(SETTINGS, "enrichment").await?,
            email_generation: self.load_domain(SETTINGS, "email_generation").await?,
            scheduling: self.load_domain(SETTINGS, "scheduling").await?,
        })
    }

    /// Apply a partial global update: validate every supplied domain, reject
    /// the whole write on the first invalid one, then commit the changed
    /// domain documents as one batch.
    pub async fn apply_global_update(
        &self,
        update: GlobalConfigUpdate,
    ) -> Result<GlobalConfig, AppError> {
        let mut config = self.load_global().await?;
        let mut writes = Vec::new();

        if let Some(smtp) = update.smtp {
            if !smtp.validate() {
                return Err(AppError::ConfigValidation(
                    "smtp configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("smtp", &smtp)?);
            config.smtp = smtp;
        }
        if let Some(api_keys) = update.api_keys {
            if !api_keys.validate() {
                return Err(AppError::ConfigValidation(
                    "api_keys configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("api_keys", &api_keys)?);
            config.api_keys = api_keys;
        }
        if let Some(lead_filter) = update.lead_filter {
            if !lead_filter.validate() {
                return Err(AppError::ConfigValidation(
                    "lead_filter configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("lead_filter", &lead_filter)?);
            config.lead_filter = lead_filter;
        }
        if let Some(job_roles) = update.job_roles {
            if !job_roles.validate() {
                return Err(AppError::ConfigValidation(
                    "job_roles configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("job_roles", &job_roles)?);
            config.job_roles = job_roles;
        }
        if let Some(enrichment) = update.enrichment {
            if !enrichment.validate() {
                return Err(AppError::ConfigValidation(
                    "enrichment configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("enrichment", &enrichment)?);
            config.enrichment = enrichment;
        }
        if let Some(email_generation) = update.email_generation {
            if !email_generation.validate() {
                return Err(AppError::ConfigValidation(
                    "email_generation configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("email_generation", &email_generation)?);
            config.email_generation = email_generation;
        }
        if let Some(scheduling) = update.scheduling {
            if !scheduling.validate() {
                return Err(AppError::ConfigValidation(
                    "scheduling configuration failed validation".to_string(),
                ));
            }
            writes.push(self.domain_write("scheduling", &scheduling)?);
            config.scheduling = scheduling;
        }

        self.docs.batch_write(writes).await?;
        tracing::info!("Global configuration updated");
        Ok(config)
    }

    /// Load a project's configuration, defaults for anything missing.
    pub async fn load_project(&self, project_id: &str) -> Result<ProjectConfig, AppError> {
        let mut config = ProjectConfig::new(project_id);

        config.location = self
            .load_domain(SETTINGS, &format!("project_{}_location", project_id))
            .await?;

        if let Some(flags) = self
            .docs
            .get(SETTINGS, &format!("project_{}", project_id))
            .await?
        {
            config.use_global_lead_filter =
                flag(&flags, "use_global_lead_filter").unwrap_or(true);
            config.use_global_job_roles = flag(&flags, "use_global_job_roles").unwrap_or(true);
            config.use_global_enrichment =
                flag(&flags, "use_global_enrichment").unwrap_or(true);
            config.use_global_email_generation =
                flag(&flags, "use_global_email_generation").unwrap_or(true);
            config.use_global_scheduling =
                flag(&flags, "use_global_scheduling").unwrap_or(true);
        }

        config.lead_filter = self
            .load_override(&format!("project_{}_lead_filter", project_id))
            .await?;
        config.job_roles = match self
            .docs
            .get(SETTINGS, &format!("project_{}_job_roles", project_id))
            .await?
        {
            Some(doc) => Some(job_roles_from_doc(&doc)),
            None => None,
        };
        config.enrichment = self
            .load_override(&format!("project_{}_enrichment", project_id))
            .await?;
        config.email_generation = self
            .load_override(&format!("project_{}_email_generation", project_id))
            .await?;
        config.scheduling = self
            .load_override(&format!("project_{}_scheduling", project_id))
            .await?;

        Ok(config)
    }

    /// Apply a partial project update, validating the pieces that will
    /// actually be consulted after the update.
    pub async fn apply_project_update(
        &self,
        project_id: &str,
        update: ProjectConfigUpdate,
    ) -> Result<ProjectConfig, AppError> {
        let mut config = self.load_project(project_id).await?;
        let mut writes = Vec::new();

        if let Some(location) = update.location {
            if !location.validate() {
                return Err(AppError::ConfigValidation(
                    "location configuration failed validation".to_string(),
                ));
            }
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_location", project_id),
                to_doc(&location)?,
            ));
            config.location = location;
        }

        if let Some(v) = update.use_global_lead_filter {
            config.use_global_lead_filter = v;
        }
        if let Some(v) = update.use_global_job_roles {
            config.use_global_job_roles = v;
        }
        if let Some(v) = update.use_global_enrichment {
            config.use_global_enrichment = v;
        }
        if let Some(v) = update.use_global_email_generation {
            config.use_global_email_generation = v;
        }
        if let Some(v) = update.use_global_scheduling {
            config.use_global_scheduling = v;
        }

        if let Some(lead_filter) = update.lead_filter {
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_lead_filter", project_id),
                to_doc(&lead_filter)?,
            ));
            config.lead_filter = Some(lead_filter);
        }
        if let Some(job_roles) = update.job_roles {
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_job_roles", project_id),
                to_doc(&job_roles)?,
            ));
            config.job_roles = Some(job_roles);
        }
        if let Some(enrichment) = update.enrichment {
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_enrichment", project_id),
                to_doc(&enrichment)?,
            ));
            config.enrichment = Some(enrichment);
        }
        if let Some(email_generation) = update.email_generation {
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_email_generation", project_id),
                to_doc(&email_generation)?,
            ));
            config.email_generation = Some(email_generation);
        }
        if let Some(scheduling) = update.scheduling {
            writes.push(DocWrite::new(
                SETTINGS,
                format!("project_{}_scheduling", project_id),
                to_doc(&scheduling)?,
            ));
            config.scheduling = Some(scheduling);
        }

        // An override that will actually be consulted must be valid
        if !config.validate() {
            return Err(AppError::ConfigValidation(
                "project configuration failed validation".to_string(),
            ));
        }

        writes.push(DocWrite::new(
            SETTINGS,
            format!("project_{}", project_id),
            serde_json::json!({
                "project_id": project_id,
                "use_global_lead_filter": config.use_global_lead_filter,
                "use_global_job_roles": config.use_global_job_roles,
                "use_global_enrichment": config.use_global_enrichment,
                "use_global_email_generation": config.use_global_email_generation,
                "use_global_scheduling": config.use_global_scheduling,
            }),
        ));

        self.docs.batch_write(writes).await?;
        tracing::info!("Project {} configuration updated", project_id);
        Ok(config)
    }

    async fn load_domain<T>(&self, collection: &str, id: &str) -> Result<T, AppError>
    where
        T: Default + for<'de> Deserialize<'de>,
    {
        match self.docs.get(collection, id).await? {
            Some(doc) => Ok(serde_json::from_value(doc).unwrap_or_else(|e| {
                tracing::warn!("Malformed {} document, using defaults: {}", id, e);
                T::default()
            })),
            None => Ok(T::default()),
        }
    }

    async fn load_override<T>(&self, id: &str) -> Result<Option<T>, AppError>
    where
        T: Default + for<'de> Deserialize<'de>,
    {
        match self.docs.get(SETTINGS, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).unwrap_or_else(|e| {
                tracing::warn!("Malformed {} document, using defaults: {}", id, e);
                T::default()
            }))),
            None => Ok(None),
        }
    }

    /// Job roles get a tolerant load: unrecognized role strings are skipped
    /// with a warning, never fatal.
    async fn load_job_roles(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<JobRolesConfig, AppError> {
        match self.docs.get(collection, id).await? {
            Some(doc) => Ok(job_roles_from_doc(&doc)),
            None => Ok(JobRolesConfig::default()),
        }
    }

    fn domain_write<T: serde::Serialize>(
        &self,
        id: &str,
        domain: &T,
    ) -> Result<DocWrite, AppError> {
        Ok(DocWrite::new(SETTINGS, id, to_doc(domain)?))
    }
}

fn to_doc<T: serde::Serialize>(domain: &T) -> Result<Value, AppError> {
    serde_json::to_value(domain)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize config: {}", e)))
}

fn flag(doc: &Value, field: &str) -> Option<bool> {
    doc.get(field).and_then(|v| v.as_bool())
}

/// Parse a job-roles document, skipping invalid role values.
pub fn job_roles_from_doc(doc: &Value) -> JobRolesConfig {
    let target_roles: Vec<JobRole> = doc
        .get("target_roles")
        .and_then(|v| v.as_array())
        .map(|roles| {
            roles
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| match JobRole::parse(s) {
                    Some(role) => Some(role),
                    None => {
                        tracing::warn!("Skipping unrecognized job role: {:?}", s);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let custom_roles: Vec<String> = doc
        .get("custom_roles")
        .and_then(|v| v.as_array())
        .map(|roles| {
            roles
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    JobRolesConfig {
        target_roles,
        custom_roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_roles_are_skipped_not_fatal() {
        let doc = json!({
            "target_roles": ["CEO", "Chief Vibes Officer", "Office Manager"],
            "custom_roles": ["Plant Manager"]
        });
        let config = job_roles_from_doc(&doc);
        assert_eq!(
            config.target_roles,
            vec![JobRole::Ceo, JobRole::OfficeManager]
        );
        assert_eq!(config.custom_roles, vec!["Plant Manager".to_string()]);
        assert!(config.validate());
    }

    #[test]
    fn empty_doc_parses_to_empty_roles() {
        let config = job_roles_from_doc(&json!({}));
        assert!(config.target_roles.is_empty());
        assert!(config.custom_roles.is_empty());
    }
}
