use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::circuit_breaker::ResearchCircuitBreaker;
use crate::config::Config;
use crate::config_model::{JobRolesConfig, LocationConfig};
use crate::enrichment::ResearchProvider;
use crate::errors::AppError;
use crate::models::RawLead;

/// Client for the Apollo.io people-search API.
pub struct ApolloService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApolloService {
    pub fn new(config: &Config, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: config.apollo_base_url.clone(),
            api_key,
        }
    }

    /// Search for people matching the targeted roles and location, returning
    /// parsed candidates. Records without a usable email are dropped during
    /// parsing.
    pub async fn search_people(
        &self,
        job_roles: &JobRolesConfig,
        location: &LocationConfig,
        num_leads: u32,
    ) -> Result<Vec<RawLead>, AppError> {
        let mut body = json!({
            "person_titles": job_roles.all_roles(),
            "page": 1,
            "per_page": num_leads.min(100),
            "contact_email_status": ["verified"],
        });

        if !location.provider_location_ids.is_empty() {
            body["organization_locations"] = json!(location.provider_location_ids);
        } else if !location.raw_location.trim().is_empty() {
            body["person_locations"] = json!([location.raw_location.trim()]);
        }

        tracing::info!(
            "Searching Apollo for up to {} people across {} role(s)",
            num_leads,
            job_roles.all_roles().len()
        );

        let response = self
            .client
            .post(format!("{}/mixed_people/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Apollo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Apollo returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Apollo returned status {}: {}",
                status, error_text
            )));
        }

        let result: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Apollo response: {}", e))
        })?;

        let people = result
            .get("people")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let candidates: Vec<RawLead> = people
            .iter()
            .filter_map(RawLead::from_provider_person)
            .collect();

        tracing::info!(
            "Apollo returned {} record(s), {} with usable emails",
            people.len(),
            candidates.len()
        );
        Ok(candidates)
    }
}

/// Client for the Perplexity research API, guarded by a circuit breaker so a
/// degraded upstream fails fast instead of eating the retry budget slowly.
pub struct PerplexityService {
    client: Client,
    base_url: String,
    api_key: String,
    breaker: Arc<ResearchCircuitBreaker>,
}

impl PerplexityService {
    pub fn new(config: &Config, api_key: String, breaker: Arc<ResearchCircuitBreaker>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.perplexity_base_url.clone(),
            api_key,
            breaker,
        }
    }

    async fn request_research(&self, prompt: &str, timeout: Duration) -> Result<String, AppError> {
        let body = json!({
            "model": "llama-3.1-sonar-small-128k-online",
            "messages": [
                {
                    "role": "system",
                    "content": "You are a business research assistant. Provide concise, factual information about companies and people."
                },
                {"role": "user", "content": prompt}
            ],
            "max_tokens": 1000,
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Perplexity request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Perplexity returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Perplexity returned status {}: {}",
                status, error_text
            )));
        }

        let result: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Perplexity response: {}", e))
        })?;

        result
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AppError::ExternalApiError("Perplexity response had no content".to_string())
            })
    }
}

impl ResearchProvider for PerplexityService {
    async fn research(&self, prompt: &str, timeout: Duration) -> Result<String, AppError> {
        use failsafe::futures::CircuitBreaker;

        match self
            .breaker
            .call(self.request_research(prompt, timeout))
            .await
        {
            Ok(text) => Ok(text),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "Research provider circuit is open, failing fast".to_string(),
            )),
        }
    }
}
