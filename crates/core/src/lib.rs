pub mod config;
pub mod domain;
pub mod errors;
pub mod scoring;

pub use config::{AppConfig, ScoringEngine};
pub use domain::analytics::{
    AnalyticsSummary, CategoryShare, MonthlyOrders, RegionPerformance, CUSTOMERS_PER_PRODUCT,
};
pub use domain::prediction::{
    ConfidenceLevel, Forecast, PredictionId, PredictionRecord, PredictionRequest,
};
pub use domain::settings::{RetentionPolicy, SettingsDocument};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use scoring::{Scorer, ScoringError, ScoringService};
