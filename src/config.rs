use std::env;

/// Which persistence backend to run against, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Persistence backend (`postgres` or `memory`)
    pub storage_backend: StorageBackend,
    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,
    /// Maximum database connections in pool
    pub database_max_connections: u32,
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Optional bearer token for higher GitHub rate limits
    pub github_token: Option<String>,
    /// Per-request timeout for upstream calls, in seconds
    pub upstream_timeout_secs: u64,
    /// Base URL of the LLM provider's generate endpoint
    pub llm_api_url: Option<String>,
    /// API key for the LLM provider
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            _ => return Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL"));
        }

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let github_api_url =
            env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());

        let github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("UPSTREAM_TIMEOUT_SECS"))?;

        let llm_api_url = env::var("LLM_API_URL").ok().filter(|u| !u.is_empty());
        let llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(Self {
            host,
            port,
            storage_backend,
            database_url,
            database_max_connections,
            github_api_url,
            github_token,
            upstream_timeout_secs,
            llm_api_url,
            llm_api_key,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
