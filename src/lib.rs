//! Lead Generation API Library
//!
//! This library provides the core functionality for the lead generation API:
//! two-tier configuration management, lead search and qualification, and
//! research-based lead enrichment.
//!
//! # Modules
//!
//! - `circuit_breaker`: Circuit breaker for the research provider.
//! - `config`: Process configuration from the environment.
//! - `config_model`: Typed configuration domains and the two-tier model.
//! - `config_store`: Configuration persistence over the document store.
//! - `db`: Database connection and pool management.
//! - `dedup`: Company/email deduplication index.
//! - `doc_store`: Schema-less document store over Postgres.
//! - `enrichment`: Enrichment retry state machine and content validation.
//! - `errors`: Error handling types.
//! - `filter`: Lead qualification pipeline.
//! - `handlers`: HTTP request handlers.
//! - `lead_store`: Lead, project and blacklist persistence.
//! - `models`: Core data models.
//! - `normalize`: Company and email normalization.
//! - `services`: External service clients (Apollo, Perplexity).

pub mod circuit_breaker;
pub mod config;
pub mod config_model;
pub mod config_store;
pub mod db;
pub mod dedup;
pub mod doc_store;
pub mod enrichment;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod lead_store;
pub mod models;
pub mod normalize;
pub mod services;
