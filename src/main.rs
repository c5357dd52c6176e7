use std::sync::Arc;

use dukaan_api::{AppConfig, AppState, PostgresRepository, RepositoryState, create_router};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

/// main
///
/// The application entry point. Loads configuration, initializes structured
/// logging, connects to Postgres, applies pending migrations, and serves the
/// router on port 3000.
#[tokio::main]
async fn main() {
    // Load variables from a local .env file if one exists. Real deployments set
    // the environment directly, so a missing file is not an error.
    dotenv::dotenv().ok();

    let config = AppConfig::load();

    // Default log filter: application at debug, HTTP plumbing at info.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dukaan_api=debug,tower_http=info,axum=info"));

    match config.env {
        // Human-readable logs for local development.
        dukaan_api::config::Env::Local => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .pretty()
                .init();
        }
        // Machine-parseable JSON lines for log aggregation in production.
        dukaan_api::config::Env::Production => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .init();
        }
    }

    tracing::info!(env = ?config.env, "starting dukaan-api");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to Postgres: {e}"));

    // Schema is managed by the embedded migrations; running them at startup
    // makes a fresh database usable without a separate provisioning step.
    sqlx::migrate!()
        .run(&pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to run database migrations: {e}"));

    let repo: RepositoryState = Arc::new(PostgresRepository::new(pool));

    let app = create_router(AppState { repo, config });

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .unwrap_or_else(|e| panic!("Failed to bind port 3000: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("Server error: {e}"));
}
