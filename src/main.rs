use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repolens::config::{Config, StorageBackend};
use repolens::services::{LlmClient, MemoryStorage, PgStorage, ProgressStore};
use repolens::{handlers, AppState, GitHubClient};

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "repolens"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repolens=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    info!("Starting repolens server on {}:{}", config.host, config.port);

    // Select the storage backend once; nothing downstream branches on it.
    let (users, repos): (
        Arc<dyn repolens::UserStore>,
        Arc<dyn repolens::RepositoryStore>,
    ) = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL is required for the postgres backend");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .expect("Failed to create database pool");
            info!("Database connection pool established");

            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .expect("Failed to run database migrations");
            info!("Database migrations completed");

            let storage = Arc::new(PgStorage::new(db_pool));
            (storage.clone() as _, storage as _)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing will survive a restart");
            let storage = Arc::new(MemoryStorage::new());
            (storage.clone() as _, storage as _)
        }
    };

    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);
    let github = GitHubClient::new(
        &config.github_api_url,
        config.github_token.clone(),
        upstream_timeout,
    )
    .expect("Failed to create GitHub client");

    let llm = match (&config.llm_api_url, &config.llm_api_key) {
        (Some(url), Some(key)) => {
            info!("LLM provider configured");
            Some(LlmClient::new(url, key, upstream_timeout).expect("Failed to create LLM client"))
        }
        _ => {
            tracing::warn!("LLM provider not configured; AI endpoints will be unavailable");
            None
        }
    };

    let server_addr = format!("{}:{}", config.host, config.port);

    let app_state = web::Data::new(AppState {
        config: config.clone(),
        users,
        repos,
        progress: ProgressStore::new(),
        github,
        llm,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/v1")
                    .configure(handlers::configure_user_routes)
                    .configure(handlers::configure_analysis_routes)
                    .configure(handlers::configure_file_routes)
                    .configure(handlers::configure_record_routes)
                    .configure(handlers::configure_ai_routes),
            )
    })
    .bind(server_addr)?
    .run()
    .await
}
