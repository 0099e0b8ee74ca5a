use async_trait::async_trait;
use thiserror::Error;

use forecast_core::domain::analytics::AnalyticsSummary;
use forecast_core::domain::prediction::{Forecast, PredictionRecord, PredictionRequest};
use forecast_core::domain::settings::SettingsDocument;

pub mod analytics;
pub mod prediction;
pub mod settings;

pub use analytics::SqlAnalyticsRepository;
pub use prediction::SqlPredictionRepository;
pub use settings::SqlSettingsRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Stores a scored request and returns the row as persisted.
    async fn save(
        &self,
        request: &PredictionRequest,
        forecast: &Forecast,
    ) -> Result<PredictionRecord, RepositoryError>;

    /// Most recent rows first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<PredictionRecord>, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self) -> Result<Option<SettingsDocument>, RepositoryError>;
    async fn replace(&self, document: &SettingsDocument) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn summary(&self) -> Result<AnalyticsSummary, RepositoryError>;
}
