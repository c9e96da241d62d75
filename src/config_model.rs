//! Typed configuration domains and the two-tier (global / per-project) model.
//!
//! Every domain is a validated value object; `ProjectConfig` can override any
//! of the five overridable domains wholesale. Resolution into an
//! [`EffectiveConfig`] is whole-domain replacement, never field-by-field
//! merging.

use serde::{Deserialize, Serialize};

use crate::normalize::is_valid_email;

/// Default research prompt, substituting `{company}`, `{name}` and `{title}`.
pub const DEFAULT_ENRICHMENT_PROMPT: &str = "\
Research the following company and person for a business outreach email:

Company: {company}
Person: {name} ({title})

Please provide:
1. Brief company overview and recent news
2. Person's background and role
3. Any recent achievements or initiatives
4. Relevant industry trends affecting them

Keep the response concise and professional.
";

const DEFAULT_OUTREACH_PROMPT: &str = "\
You are writing a professional outreach email for a business proposal.

Context:
- Project: {project_name}
- Project Description: {project_description}
- Target: {name} at {company}
- Enrichment Data: {enrichment_data}

Write a personalized, professional email that:
1. Is concise (under 150 words)
2. Clearly states the value proposition
3. Includes a specific call to action
4. Uses the enrichment data naturally
5. Feels personal, not template-like

Subject line and email body:
";

const DEFAULT_FOLLOWUP_PROMPT: &str = "\
You are writing a follow-up email for a business proposal.

Context:
- Previous email sent {days_ago} days ago
- Project: {project_name}
- Target: {name} at {company}
- Original email: {original_email}

Write a brief, professional follow-up that:
1. Acknowledges the previous email
2. Adds new value or perspective
3. Is even more concise (under 100 words)
4. Maintains professionalism
5. Includes a clear call to action

Subject line and email body:
";

// ============ Config Domains ============

/// SMTP configuration for email sending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// True for 465, false for other ports.
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub reply_to_email: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            secure: false,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            from_name: String::new(),
            reply_to_email: None,
        }
    }
}

impl SmtpConfig {
    pub fn validate(&self) -> bool {
        if self.host.is_empty() || self.username.is_empty() || self.password.is_empty() {
            return false;
        }
        if !is_valid_email(&self.from_email) {
            return false;
        }
        if let Some(reply_to) = &self.reply_to_email {
            if !is_valid_email(reply_to) {
                return false;
            }
        }
        true
    }
}

/// API keys for the external collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiKeysConfig {
    pub openai_api_key: String,
    pub apollo_api_key: String,
    pub apifi_api_key: String,
    pub perplexity_api_key: String,
}

impl ApiKeysConfig {
    /// At minimum, search and generation need their keys.
    pub fn validate(&self) -> bool {
        !self.openai_api_key.is_empty() && !self.apollo_api_key.is_empty()
    }
}

/// Configuration for lead filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeadFilterConfig {
    pub one_person_per_company: bool,
    pub require_email: bool,
    pub exclude_blacklisted: bool,
    pub min_company_size: Option<u32>,
    pub max_company_size: Option<u32>,
}

impl Default for LeadFilterConfig {
    fn default() -> Self {
        Self {
            one_person_per_company: true,
            require_email: true,
            exclude_blacklisted: true,
            min_company_size: None,
            max_company_size: None,
        }
    }
}

impl LeadFilterConfig {
    pub fn validate(&self) -> bool {
        match (self.min_company_size, self.max_company_size) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

/// Location targeting for the candidate search, always project-specific.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub raw_location: String,
    pub provider_location_ids: Vec<String>,
    pub use_llm_parsing: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            raw_location: String::new(),
            provider_location_ids: Vec::new(),
            use_llm_parsing: true,
        }
    }
}

impl LocationConfig {
    pub fn validate(&self) -> bool {
        if self.use_llm_parsing {
            !self.raw_location.trim().is_empty()
        } else {
            !self.provider_location_ids.is_empty()
        }
    }
}

/// Job roles targeted when searching for candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobRole {
    #[serde(rename = "CEO")]
    Ceo,
    #[serde(rename = "CTO")]
    Cto,
    #[serde(rename = "Founder")]
    Founder,
    #[serde(rename = "Co-Founder")]
    CoFounder,
    #[serde(rename = "President")]
    President,
    #[serde(rename = "VP Engineering")]
    VpEngineering,
    #[serde(rename = "VP Technology")]
    VpTechnology,
    #[serde(rename = "Head of Engineering")]
    HeadOfEngineering,
    #[serde(rename = "Engineering Manager")]
    EngineeringManager,
    #[serde(rename = "Technical Director")]
    TechnicalDirector,
    #[serde(rename = "Human Resources")]
    HumanResources,
    #[serde(rename = "Office Manager")]
    OfficeManager,
    #[serde(rename = "Secretary")]
    Secretary,
    #[serde(rename = "Assistant")]
    Assistant,
    #[serde(rename = "Assistant Manager")]
    AssistantManager,
    #[serde(rename = "Manager")]
    Manager,
    #[serde(rename = "Social Media")]
    SocialMedia,
}

impl JobRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRole::Ceo => "CEO",
            JobRole::Cto => "CTO",
            JobRole::Founder => "Founder",
            JobRole::CoFounder => "Co-Founder",
            JobRole::President => "President",
            JobRole::VpEngineering => "VP Engineering",
            JobRole::VpTechnology => "VP Technology",
            JobRole::HeadOfEngineering => "Head of Engineering",
            JobRole::EngineeringManager => "Engineering Manager",
            JobRole::TechnicalDirector => "Technical Director",
            JobRole::HumanResources => "Human Resources",
            JobRole::OfficeManager => "Office Manager",
            JobRole::Secretary => "Secretary",
            JobRole::Assistant => "Assistant",
            JobRole::AssistantManager => "Assistant Manager",
            JobRole::Manager => "Manager",
            JobRole::SocialMedia => "Social Media",
        }
    }

    /// Parse a stored role string. Returns `None` for unrecognized values so
    /// the caller can skip them with a warning instead of failing the load.
    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
    }
}

/// Job role configuration for lead finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobRolesConfig {
    pub target_roles: Vec<JobRole>,
    pub custom_roles: Vec<String>,
}

impl Default for JobRolesConfig {
    fn default() -> Self {
        Self {
            target_roles: vec![
                JobRole::HumanResources,
                JobRole::OfficeManager,
                JobRole::Secretary,
                JobRole::Assistant,
                JobRole::AssistantManager,
                JobRole::Manager,
                JobRole::SocialMedia,
            ],
            custom_roles: Vec::new(),
        }
    }
}

impl JobRolesConfig {
    /// All targeted roles as plain strings, built-in roles first.
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self
            .target_roles
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();
        roles.extend(self.custom_roles.iter().cloned());
        roles
    }

    pub fn validate(&self) -> bool {
        !self.target_roles.is_empty() || !self.custom_roles.is_empty()
    }
}

/// Configuration for lead enrichment via the research collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub prompt_template: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            timeout_seconds: 30,
            prompt_template: DEFAULT_ENRICHMENT_PROMPT.to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn validate(&self) -> bool {
        self.max_retries > 0
            && self.timeout_seconds > 0
            && self.prompt_template.contains("{company}")
            && self.prompt_template.contains("{name}")
    }
}

/// Configuration for email generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailGenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub outreach_prompt: String,
    pub followup_prompt: String,
}

impl Default for EmailGenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            outreach_prompt: DEFAULT_OUTREACH_PROMPT.to_string(),
            followup_prompt: DEFAULT_FOLLOWUP_PROMPT.to_string(),
        }
    }
}

impl EmailGenerationConfig {
    pub fn validate(&self) -> bool {
        self.max_tokens > 0
            && (0.0..=2.0).contains(&self.temperature)
            && self.outreach_prompt.contains("{project_name}")
            && self.outreach_prompt.contains("{name}")
    }
}

/// Configuration for outreach scheduling and follow-ups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulingConfig {
    pub followup_delay_days: u32,
    pub max_followups: u32,
    pub daily_email_limit: u32,
    pub rate_limit_delay_seconds: u32,
    pub working_hours_start: u8,
    pub working_hours_end: u8,
    /// Days of week, 0 = Monday.
    pub working_days: Vec<u8>,
    pub timezone: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            followup_delay_days: 7,
            max_followups: 3,
            daily_email_limit: 50,
            rate_limit_delay_seconds: 60,
            working_hours_start: 9,
            working_hours_end: 17,
            working_days: vec![0, 1, 2, 3, 4],
            timezone: "UTC".to_string(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> bool {
        self.followup_delay_days > 0
            && self.daily_email_limit > 0
            && self.working_hours_start < 24
            && self.working_hours_end < 24
            && self.working_hours_start < self.working_hours_end
            && self.working_days.iter().all(|d| *d <= 6)
    }
}

// ============ Two-Tier Model ============

/// Organization-wide defaults, one per deployment.
///
/// Never deleted; lazily created with defaults when first read from a store
/// that has no settings documents yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub smtp: SmtpConfig,
    pub api_keys: ApiKeysConfig,
    pub lead_filter: LeadFilterConfig,
    pub job_roles: JobRolesConfig,
    pub enrichment: EnrichmentConfig,
    pub email_generation: EmailGenerationConfig,
    pub scheduling: SchedulingConfig,
}

impl GlobalConfig {
    pub fn validate(&self) -> bool {
        self.smtp.validate()
            && self.api_keys.validate()
            && self.lead_filter.validate()
            && self.job_roles.validate()
            && self.enrichment.validate()
            && self.email_generation.validate()
            && self.scheduling.validate()
    }
}

/// Per-project configuration: a location plus optional whole-domain overrides.
///
/// Each `use_global_*` flag selects the global domain when true. When the flag
/// is false the override applies only if one is actually present; a false flag
/// with no override falls back to the global value silently, by design.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    pub project_id: String,
    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default = "default_true")]
    pub use_global_lead_filter: bool,
    #[serde(default = "default_true")]
    pub use_global_job_roles: bool,
    #[serde(default = "default_true")]
    pub use_global_enrichment: bool,
    #[serde(default = "default_true")]
    pub use_global_email_generation: bool,
    #[serde(default = "default_true")]
    pub use_global_scheduling: bool,

    #[serde(default)]
    pub lead_filter: Option<LeadFilterConfig>,
    #[serde(default)]
    pub job_roles: Option<JobRolesConfig>,
    #[serde(default)]
    pub enrichment: Option<EnrichmentConfig>,
    #[serde(default)]
    pub email_generation: Option<EmailGenerationConfig>,
    #[serde(default)]
    pub scheduling: Option<SchedulingConfig>,
}

fn default_true() -> bool {
    true
}

impl ProjectConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: LocationConfig::default(),
            use_global_lead_filter: true,
            use_global_job_roles: true,
            use_global_enrichment: true,
            use_global_email_generation: true,
            use_global_scheduling: true,
            lead_filter: None,
            job_roles: None,
            enrichment: None,
            email_generation: None,
            scheduling: None,
        }
    }

    /// Overrides are validated only when they would actually be consulted.
    pub fn validate(&self) -> bool {
        if !self.location.validate() {
            return false;
        }
        if !self.use_global_lead_filter {
            if let Some(c) = &self.lead_filter {
                if !c.validate() {
                    return false;
                }
            }
        }
        if !self.use_global_job_roles {
            if let Some(c) = &self.job_roles {
                if !c.validate() {
                    return false;
                }
            }
        }
        if !self.use_global_enrichment {
            if let Some(c) = &self.enrichment {
                if !c.validate() {
                    return false;
                }
            }
        }
        if !self.use_global_email_generation {
            if let Some(c) = &self.email_generation {
                if !c.validate() {
                    return false;
                }
            }
        }
        if !self.use_global_scheduling {
            if let Some(c) = &self.scheduling {
                if !c.validate() {
                    return false;
                }
            }
        }
        true
    }

    /// Resolve this project against the global defaults.
    ///
    /// Pure per-domain selection over well-formed inputs: no re-validation,
    /// no field merging, no error conditions.
    pub fn resolve(&self, global: &GlobalConfig) -> EffectiveConfig {
        EffectiveConfig {
            project_id: self.project_id.clone(),
            location: self.location.clone(),
            lead_filter: select_domain(
                self.use_global_lead_filter,
                &self.lead_filter,
                &global.lead_filter,
            )
            .clone(),
            job_roles: select_domain(
                self.use_global_job_roles,
                &self.job_roles,
                &global.job_roles,
            )
            .clone(),
            enrichment: select_domain(
                self.use_global_enrichment,
                &self.enrichment,
                &global.enrichment,
            )
            .clone(),
            email_generation: select_domain(
                self.use_global_email_generation,
                &self.email_generation,
                &global.email_generation,
            )
            .clone(),
            scheduling: select_domain(
                self.use_global_scheduling,
                &self.scheduling,
                &global.scheduling,
            )
            .clone(),
        }
    }
}

/// Whole-domain selection: the override wins only when the flag is off AND an
/// override is present. A missing override falls back to global.
fn select_domain<'a, T>(use_global: bool, override_value: &'a Option<T>, global: &'a T) -> &'a T {
    if !use_global {
        if let Some(value) = override_value {
            return value;
        }
    }
    global
}

/// The resolved configuration for a project. Derived and read-only; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveConfig {
    pub project_id: String,
    pub location: LocationConfig,
    pub lead_filter: LeadFilterConfig,
    pub job_roles: JobRolesConfig,
    pub enrichment: EnrichmentConfig,
    pub email_generation: EmailGenerationConfig,
    pub scheduling: SchedulingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_global_config_has_original_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.smtp.host, "smtp.gmail.com");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.enrichment.max_retries, 3);
        assert_eq!(config.enrichment.timeout_seconds, 30);
        assert_eq!(config.scheduling.followup_delay_days, 7);
        assert_eq!(config.job_roles.target_roles.len(), 7);
    }

    #[test]
    fn job_role_round_trips_display_names() {
        assert_eq!(JobRole::parse("Office Manager"), Some(JobRole::OfficeManager));
        assert_eq!(JobRole::parse("CEO"), Some(JobRole::Ceo));
        assert_eq!(JobRole::parse("Wizard"), None);
        assert_eq!(JobRole::OfficeManager.as_str(), "Office Manager");
    }

    #[test]
    fn lead_filter_validates_size_bounds() {
        let mut filter = LeadFilterConfig::default();
        assert!(filter.validate());

        filter.min_company_size = Some(100);
        filter.max_company_size = Some(50);
        assert!(!filter.validate());

        filter.max_company_size = Some(100);
        assert!(filter.validate());
    }

    #[test]
    fn enrichment_requires_placeholders() {
        let mut config = EnrichmentConfig::default();
        assert!(config.validate());

        config.prompt_template = "no placeholders".to_string();
        assert!(!config.validate());

        config.prompt_template = "about {company}".to_string();
        assert!(!config.validate());

        config.prompt_template = "about {company} and {name}".to_string();
        assert!(config.validate());

        config.max_retries = 0;
        assert!(!config.validate());
    }
}
