//! Sales scoring engines.
//!
//! Two interchangeable engines map a [`PredictionRequest`] to a [`Forecast`]:
//! a closed-form heuristic over fixed lookup tables, and a random-forest
//! regressor trained once on synthetic data. Request handlers only see the
//! [`ScoringService`] built at startup.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ScoringConfig, ScoringEngine};
use crate::domain::prediction::{Forecast, PredictionRequest};
use crate::errors::ApplicationError;

pub mod encoder;
pub mod forest;
pub mod heuristic;
pub mod regression;

pub use encoder::LabelEncoder;
pub use forest::{RandomForest, RegressionTree};
pub use heuristic::HeuristicScorer;
pub use regression::{ForestBundle, ForestScorer};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("unknown {field} `{value}`; the regression model was not trained on it")]
    UnknownLabel { field: &'static str, value: String },
    #[error("model artifact error: {0}")]
    Artifact(String),
}

pub trait Scorer: Send + Sync {
    fn engine(&self) -> ScoringEngine;

    fn score(&self, request: &PredictionRequest) -> Result<Forecast, ScoringError>;
}

/// Immutable scoring entry point shared by every request handler.
#[derive(Clone)]
pub struct ScoringService {
    scorer: Arc<dyn Scorer>,
}

impl ScoringService {
    pub fn new(scorer: impl Scorer + 'static) -> Self {
        Self { scorer: Arc::new(scorer) }
    }

    pub fn heuristic() -> Self {
        Self::new(HeuristicScorer)
    }

    /// Builds the configured engine. The forest engine loads its artifact from
    /// `config.model_path`, training and caching a new one when it is missing.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ScoringError> {
        match config.engine {
            ScoringEngine::Heuristic => Ok(Self::heuristic()),
            ScoringEngine::Forest => {
                Ok(Self::new(ForestScorer::load_or_train(Path::new(&config.model_path))?))
            }
        }
    }

    pub fn engine(&self) -> ScoringEngine {
        self.scorer.engine()
    }

    /// Validates the request and scores it.
    pub fn predict(&self, request: &PredictionRequest) -> Result<Forecast, ApplicationError> {
        request.validate()?;
        Ok(self.scorer.score(request)?)
    }
}

impl std::fmt::Debug for ScoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringService").field("engine", &self.engine()).finish()
    }
}
