use forecast_core::config::{AppConfig, ConfigError, LoadOptions, ScoringEngine};
use forecast_core::scoring::{ScoringError, ScoringService};
use forecast_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub scoring: ScoringService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("scoring engine unavailable: {0}")]
    Scoring(#[from] ScoringError),
    #[error("scoring engine initialization panicked: {0}")]
    ScoringTask(#[source] tokio::task::JoinError),
    #[error("upload directory `{path}` could not be created: {source}")]
    UploadDir { path: String, source: std::io::Error },
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        engine = config.scoring.engine.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    tokio::fs::create_dir_all(&config.server.upload_dir).await.map_err(|source| {
        BootstrapError::UploadDir { path: config.server.upload_dir.clone(), source }
    })?;

    let scoring = match config.scoring.engine {
        ScoringEngine::Heuristic => ScoringService::heuristic(),
        // Training the forest is CPU-bound; keep it off the async workers.
        ScoringEngine::Forest => {
            let scoring_config = config.scoring.clone();
            tokio::task::spawn_blocking(move || ScoringService::from_config(&scoring_config))
                .await
                .map_err(BootstrapError::ScoringTask)??
        }
    };
    info!(
        event_name = "system.bootstrap.scoring_ready",
        correlation_id = "bootstrap",
        engine = scoring.engine().as_str(),
        "scoring engine ready"
    );

    Ok(Application { config, db_pool, scoring })
}
