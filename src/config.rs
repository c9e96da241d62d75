use serde::Deserialize;

/// Process-level configuration loaded from the environment.
///
/// Domain configuration (lead filters, enrichment settings, ...) lives in the
/// document store and is managed through the config endpoints; this struct only
/// covers what the process needs before it can talk to the store.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL for the candidate search provider. Overridable so tests can
    /// point it at a mock server.
    pub apollo_base_url: String,
    /// Base URL for the research provider.
    pub perplexity_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            apollo_base_url: std::env::var("APOLLO_BASE_URL")
                .unwrap_or_else(|_| "https://api.apollo.io/api/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            perplexity_base_url: std::env::var("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|_| "https://api.perplexity.ai".to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Apollo base URL: {}", config.apollo_base_url);
        tracing::debug!("Perplexity base URL: {}", config.perplexity_base_url);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
