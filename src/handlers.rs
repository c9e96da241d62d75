use crate::circuit_breaker::ResearchCircuitBreaker;
use crate::config::Config;
use crate::config_store::{ConfigStore, GlobalConfigUpdate, ProjectConfigUpdate};
use crate::dedup::DeduplicationIndex;
use crate::doc_store::DocStore;
use crate::enrichment::EnrichmentRetryController;
use crate::enrichment::EnrichmentState;
use crate::errors::{AppError, ResultExt};
use crate::filter::{filtering_stats, LeadFilterPipeline};
use crate::lead_store::LeadStore;
use crate::models::*;
use crate::services::{ApolloService, PerplexityService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config_model::GlobalConfig;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Document store over the database.
    pub docs: DocStore,
    /// Typed configuration persistence.
    pub config_store: ConfigStore,
    /// Lead, project and blacklist persistence.
    pub lead_store: LeadStore,
    /// Short-TTL cache of the global configuration to keep per-request reads
    /// off the store.
    pub global_config_cache: Cache<String, GlobalConfig>,
    /// Guard against concurrent runs on the same project. Key is
    /// "find:{project_id}" or "enrich:{project_id}", value is the start time.
    pub active_runs: Cache<String, i64>,
    /// Circuit breaker shared by all research calls.
    pub research_breaker: Arc<ResearchCircuitBreaker>,
}

const GLOBAL_CONFIG_KEY: &str = "global";

async fn load_global_cached(state: &AppState) -> Result<GlobalConfig, AppError> {
    if let Some(config) = state.global_config_cache.get(GLOBAL_CONFIG_KEY).await {
        return Ok(config);
    }
    let config = state.config_store.load_global().await?;
    state
        .global_config_cache
        .insert(GLOBAL_CONFIG_KEY.to_string(), config.clone())
        .await;
    Ok(config)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leadgen-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/config/global
pub async fn get_global_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = load_global_cached(&state).await?;
    Ok(Json(json!({
        "success": true,
        "config": config,
    })))
}

/// PUT /api/v1/config/global
///
/// Whole-domain replacement for each domain present in the body. Any invalid
/// domain rejects the entire update before anything is written.
pub async fn update_global_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<GlobalConfigUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = state
        .config_store
        .apply_global_update(update)
        .await
        .context("Failed to update global configuration")?;

    state.global_config_cache.invalidate(GLOBAL_CONFIG_KEY).await;

    Ok(Json(json!({
        "success": true,
        "message": "Global configuration updated",
        "config": config,
    })))
}

/// GET /api/v1/projects/:project_id/config
///
/// Returns the stored project configuration together with its resolved
/// effective view.
pub async fn get_project_config(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let global = load_global_cached(&state).await?;
    let project = state.config_store.load_project(&project_id).await?;
    let effective = project.resolve(&global);

    Ok(Json(json!({
        "success": true,
        "config": {
            "project_id": project.project_id,
            "location": project.location,
            "use_global_lead_filter": project.use_global_lead_filter,
            "use_global_job_roles": project.use_global_job_roles,
            "use_global_enrichment": project.use_global_enrichment,
            "use_global_email_generation": project.use_global_email_generation,
            "use_global_scheduling": project.use_global_scheduling,
            "effective_config": {
                "lead_filter": effective.lead_filter,
                "job_roles": effective.job_roles,
                "enrichment": effective.enrichment,
                "email_generation": effective.email_generation,
                "scheduling": effective.scheduling,
            },
        },
    })))
}

/// PUT /api/v1/projects/:project_id/config
pub async fn update_project_config(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(update): Json<ProjectConfigUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let project = state
        .config_store
        .apply_project_update(&project_id, update)
        .await
        .context(format!("Failed to update project {} configuration", project_id))?;

    let global = load_global_cached(&state).await?;
    let effective = project.resolve(&global);

    Ok(Json(json!({
        "success": true,
        "message": "Project configuration updated",
        "config": {
            "project_id": project.project_id,
            "location": project.location,
            "use_global_lead_filter": project.use_global_lead_filter,
            "use_global_job_roles": project.use_global_job_roles,
            "use_global_enrichment": project.use_global_enrichment,
            "use_global_email_generation": project.use_global_email_generation,
            "use_global_scheduling": project.use_global_scheduling,
            "effective_config": {
                "lead_filter": effective.lead_filter,
                "job_roles": effective.job_roles,
                "enrichment": effective.enrichment,
                "email_generation": effective.email_generation,
                "scheduling": effective.scheduling,
            },
        },
    })))
}

/// POST /api/v1/projects/:project_id/find-leads
///
/// Runs the full search-and-qualify workflow for one project. Only one run
/// per project may be in flight at a time.
pub async fn find_leads(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(request): Json<FindLeadsRequest>,
) -> Result<Json<FindLeadsResponse>, AppError> {
    tracing::info!("POST /projects/{}/find-leads", project_id);

    if state.lead_store.get_project(&project_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Project {} not found",
            project_id
        )));
    }

    let guard_key = format!("find:{}", project_id);
    if state.active_runs.get(&guard_key).await.is_some() {
        return Err(AppError::BadRequest(format!(
            "A lead generation run is already in progress for project {}",
            project_id
        )));
    }
    state
        .active_runs
        .insert(guard_key.clone(), Utc::now().timestamp())
        .await;

    let result = find_leads_inner(&state, &project_id, request).await;
    state.active_runs.invalidate(&guard_key).await;
    result.map(Json)
}

async fn find_leads_inner(
    state: &AppState,
    project_id: &str,
    request: FindLeadsRequest,
) -> Result<FindLeadsResponse, AppError> {
    let global = load_global_cached(state).await?;
    let project = state.config_store.load_project(project_id).await?;
    let effective = project.resolve(&global);

    if global.api_keys.apollo_api_key.is_empty() {
        return Err(AppError::BadRequest(
            "Apollo API key is not configured".to_string(),
        ));
    }

    let num_leads = request.num_leads.unwrap_or(25);
    let apollo = ApolloService::new(&state.config, global.api_keys.apollo_api_key.clone());
    let candidates = apollo
        .search_people(&effective.job_roles, &effective.location, num_leads)
        .await
        .context("Candidate search failed")?;
    let leads_found = candidates.len();

    let blacklist = state.lead_store.blacklisted_emails(project_id).await?;
    let existing = state.lead_store.leads_for_project(project_id).await?;
    let mut index = DeduplicationIndex::from_existing(&existing);

    let pipeline = LeadFilterPipeline::new(effective.lead_filter.clone(), blacklist);
    let qualified = pipeline.apply(candidates, &mut index);
    let qualified_count = qualified.len();
    let fresh = pipeline.remove_known_emails(qualified, &index);
    let duplicates_filtered = qualified_count - fresh.len();

    let stats = filtering_stats(leads_found, fresh.len(), &effective.lead_filter);

    let leads: Vec<Lead> = fresh
        .into_iter()
        .map(|candidate| Lead::from_candidate(candidate, project_id))
        .collect();
    state
        .lead_store
        .write_leads(&leads)
        .await
        .context("Failed to persist new leads")?;
    state
        .lead_store
        .bump_lead_count(project_id, leads.len())
        .await?;

    tracing::info!(
        "Project {}: {} found, {} added, {} duplicate(s) removed",
        project_id,
        leads_found,
        leads.len(),
        duplicates_filtered
    );

    Ok(FindLeadsResponse {
        success: true,
        message: format!("Added {} new lead(s)", leads.len()),
        project_id: project_id.to_string(),
        leads_found,
        leads_added: leads.len(),
        duplicates_filtered,
        stats,
    })
}

/// POST /api/v1/projects/:project_id/enrich-leads
///
/// Enriches the selected leads strictly one at a time.
pub async fn enrich_leads(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(request): Json<EnrichLeadsRequest>,
) -> Result<Json<EnrichLeadsResponse>, AppError> {
    tracing::info!("POST /projects/{}/enrich-leads", project_id);

    if state.lead_store.get_project(&project_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Project {} not found",
            project_id
        )));
    }

    let guard_key = format!("enrich:{}", project_id);
    if state.active_runs.get(&guard_key).await.is_some() {
        return Err(AppError::BadRequest(format!(
            "An enrichment run is already in progress for project {}",
            project_id
        )));
    }
    state
        .active_runs
        .insert(guard_key.clone(), Utc::now().timestamp())
        .await;

    let result = enrich_leads_inner(&state, &project_id, request).await;
    state.active_runs.invalidate(&guard_key).await;
    result.map(Json)
}

async fn enrich_leads_inner(
    state: &AppState,
    project_id: &str,
    request: EnrichLeadsRequest,
) -> Result<EnrichLeadsResponse, AppError> {
    let global = load_global_cached(state).await?;
    let project = state.config_store.load_project(project_id).await?;
    let effective = project.resolve(&global);

    if !effective.enrichment.enabled {
        return Ok(EnrichLeadsResponse {
            success: true,
            message: "Enrichment is disabled for this project".to_string(),
            project_id: project_id.to_string(),
            leads_processed: 0,
            leads_enriched: 0,
            leads_failed: 0,
        });
    }

    if global.api_keys.perplexity_api_key.is_empty() {
        return Err(AppError::BadRequest(
            "Perplexity API key is not configured".to_string(),
        ));
    }

    // A failed lead restarts at pending only when the caller forces it;
    // an enriched lead is never redone
    let wants_enrichment = |lead: &Lead| match lead.enrichment_status {
        None => true,
        Some(EnrichmentStatus::Pending) => true,
        Some(EnrichmentStatus::Failed) => request.force_re_enrich,
        Some(EnrichmentStatus::Enriched) => false,
    };

    let mut targets: Vec<Lead> = Vec::new();
    if !request.lead_ids.is_empty() {
        for id in &request.lead_ids {
            match state.lead_store.get_lead(*id).await? {
                Some(lead) if lead.project_id == project_id => {
                    if wants_enrichment(&lead) {
                        targets.push(lead);
                    } else {
                        tracing::debug!("Lead {} needs no enrichment, skipping", id);
                    }
                }
                Some(_) => {
                    tracing::warn!("Lead {} does not belong to project {}", id, project_id)
                }
                None => tracing::warn!("Lead {} not found", id),
            }
        }
    } else {
        targets = state
            .lead_store
            .leads_for_project(project_id)
            .await?
            .into_iter()
            .filter(wants_enrichment)
            .collect();
    }

    let provider = PerplexityService::new(
        &state.config,
        global.api_keys.perplexity_api_key.clone(),
        state.research_breaker.clone(),
    );
    let controller = EnrichmentRetryController::new(&provider, &effective.enrichment);

    let mut enriched = 0usize;
    let mut failed = 0usize;
    let mut updated = Vec::with_capacity(targets.len());

    for mut lead in targets {
        match controller.run(&lead).await {
            EnrichmentState::Enriched { research, attempts } => {
                lead.enrichment_status = Some(EnrichmentStatus::Enriched);
                lead.enrichment_data = Some(research);
                lead.enrichment_error = None;
                lead.enrichment_attempts = attempts;
                lead.enrichment_type = Some(request.enrichment_type);
                lead.last_enrichment_date = Some(Utc::now());
                enriched += 1;
            }
            EnrichmentState::Failed { error, attempts } => {
                lead.enrichment_status = Some(EnrichmentStatus::Failed);
                lead.enrichment_error = Some(error);
                lead.enrichment_attempts = attempts;
                lead.enrichment_type = Some(request.enrichment_type);
                lead.last_enrichment_date = Some(Utc::now());
                failed += 1;
            }
            EnrichmentState::Pending { .. } => {
                // The controller only returns terminal states
                unreachable!("enrichment controller returned a non-terminal state")
            }
        }
        updated.push(lead);
    }

    state
        .lead_store
        .write_leads(&updated)
        .await
        .context("Failed to persist enrichment results")?;

    if let Err(e) = state
        .lead_store
        .record_enrichment_run(project_id, enriched, failed)
        .await
    {
        tracing::warn!("Failed to record enrichment run stats: {}", e);
    }

    tracing::info!(
        "Project {}: enriched {}, failed {} of {} lead(s)",
        project_id,
        enriched,
        failed,
        updated.len()
    );

    Ok(EnrichLeadsResponse {
        success: true,
        message: format!("Processed {} lead(s)", updated.len()),
        project_id: project_id.to_string(),
        leads_processed: updated.len(),
        leads_enriched: enriched,
        leads_failed: failed,
    })
}

/// GET /api/v1/projects/:project_id/enrichment-status
pub async fn enrichment_status(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<EnrichmentStatusResponse>, AppError> {
    if state.lead_store.get_project(&project_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Project {} not found",
            project_id
        )));
    }

    let leads = state.lead_store.leads_for_project(&project_id).await?;
    let total_leads = leads.len();
    let enriched_leads = leads
        .iter()
        .filter(|l| l.enrichment_status == Some(EnrichmentStatus::Enriched))
        .count();
    let failed_leads = leads
        .iter()
        .filter(|l| l.enrichment_status == Some(EnrichmentStatus::Failed))
        .count();
    let pending_leads = total_leads - enriched_leads - failed_leads;

    let enrichment_percentage = if total_leads > 0 {
        (enriched_leads as f64 / total_leads as f64 * 10000.0).round() / 100.0
    } else {
        0.0
    };

    Ok(Json(EnrichmentStatusResponse {
        success: true,
        project_id,
        total_leads,
        enriched_leads,
        failed_leads,
        pending_leads,
        enrichment_percentage,
    }))
}
