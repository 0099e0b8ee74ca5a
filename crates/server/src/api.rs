//! JSON API for scoring, prediction history, analytics, and settings.
//!
//! Endpoints:
//! - `POST /predict`      score a request without storing it
//! - `POST /predictions`  score and store, returning the stored record
//! - `GET  /predictions`  most recent stored records (`?limit=N`)
//! - `GET  /analytics`    aggregates over stored records
//! - `GET  /settings`     the stored settings document
//! - `PUT  /settings`     replace the settings document

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forecast_core::domain::analytics::AnalyticsSummary;
use forecast_core::domain::prediction::{Forecast, PredictionRecord, PredictionRequest};
use forecast_core::domain::settings::SettingsDocument;
use forecast_core::errors::{ApplicationError, DomainError, InterfaceError};
use forecast_core::scoring::ScoringService;
use forecast_db::repositories::{
    AnalyticsRepository, PredictionRepository, RepositoryError, SettingsRepository,
    SqlAnalyticsRepository, SqlPredictionRepository, SqlSettingsRepository,
};
use forecast_db::DbPool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct ApiState {
    scoring: ScoringService,
    predictions: Arc<dyn PredictionRepository>,
    settings: Arc<dyn SettingsRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
}

impl ApiState {
    pub fn new(db_pool: DbPool, scoring: ScoringService) -> Self {
        Self {
            scoring,
            predictions: Arc::new(SqlPredictionRepository::new(db_pool.clone())),
            settings: Arc::new(SqlSettingsRepository::new(db_pool.clone())),
            analytics: Arc::new(SqlAnalyticsRepository::new(db_pool)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// An [`InterfaceError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn new(error: ApplicationError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Only client errors echo their detail.
        let message = match &self.0 {
            InterfaceError::BadRequest { message, .. } => message.clone(),
            other => other.user_message().to_string(),
        };
        let body = ErrorBody { error: message, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/predictions", post(create_prediction).get(list_predictions))
        .route("/analytics", get(analytics))
        .route("/settings", get(get_settings).put(put_settings))
        .with_state(state)
}

pub fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn persistence_error(error: RepositoryError, correlation_id: &str) -> ApiError {
    error!(
        event_name = "api.persistence.failed",
        correlation_id = %correlation_id,
        error = %error,
        "database operation failed"
    );
    ApiError::new(ApplicationError::Persistence(error.to_string()), correlation_id)
}

/// Unwraps a JSON body, reporting malformed or incomplete bodies as 400s.
fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    correlation_id: &str,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(
            event_name = "api.body.rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "request body rejected"
        );
        ApiError::new(DomainError::InvalidRequest(rejection.body_text()).into(), correlation_id)
    })
}

fn score(
    state: &ApiState,
    request: &PredictionRequest,
    correlation_id: &str,
) -> Result<Forecast, ApiError> {
    state.scoring.predict(request).map_err(|error| {
        warn!(
            event_name = "api.predict.rejected",
            correlation_id = %correlation_id,
            engine = state.scoring.engine().as_str(),
            error = %error,
            "prediction request rejected"
        );
        ApiError::new(error, correlation_id)
    })
}

pub fn clamp_limit(limit: Option<i64>) -> u32 {
    match limit {
        None => DEFAULT_LIST_LIMIT,
        Some(value) => value.clamp(0, i64::from(MAX_LIST_LIMIT)) as u32,
    }
}

pub async fn predict(
    State(state): State<ApiState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<Forecast>, ApiError> {
    let correlation_id = correlation_id();
    let request = json_body(body, &correlation_id)?;
    let forecast = score(&state, &request, &correlation_id)?;

    info!(
        event_name = "api.predict.scored",
        correlation_id = %correlation_id,
        engine = state.scoring.engine().as_str(),
        category = %request.category,
        predicted_sales = forecast.predicted_sales,
        confidence_level = forecast.confidence_level.as_str(),
        "prediction scored"
    );
    Ok(Json(forecast))
}

pub async fn create_prediction(
    State(state): State<ApiState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionRecord>, ApiError> {
    let correlation_id = correlation_id();
    let request = json_body(body, &correlation_id)?;
    let forecast = score(&state, &request, &correlation_id)?;

    let record = state
        .predictions
        .save(&request, &forecast)
        .await
        .map_err(|error| persistence_error(error, &correlation_id))?;

    info!(
        event_name = "api.prediction.saved",
        correlation_id = %correlation_id,
        prediction_id = record.id.0,
        engine = state.scoring.engine().as_str(),
        "prediction stored"
    );
    Ok(Json(record))
}

pub async fn list_predictions(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PredictionRecord>>, ApiError> {
    let correlation_id = correlation_id();
    let records = state
        .predictions
        .list_recent(clamp_limit(query.limit))
        .await
        .map_err(|error| persistence_error(error, &correlation_id))?;
    Ok(Json(records))
}

pub async fn analytics(State(state): State<ApiState>) -> Result<Json<AnalyticsSummary>, ApiError> {
    let correlation_id = correlation_id();
    let summary =
        state.analytics.summary().await.map_err(|error| persistence_error(error, &correlation_id))?;
    Ok(Json(summary))
}

pub async fn get_settings(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let loaded =
        state.settings.load().await.map_err(|error| persistence_error(error, &correlation_id))?;

    Ok(Json(match loaded {
        Some(document) => json!({ "payload": document }),
        None => json!({}),
    }))
}

pub async fn put_settings(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let body = json_body(body, &correlation_id)?;
    let document = SettingsDocument::from_payload(body)
        .map_err(|error| ApiError::new(error.into(), &correlation_id))?;

    state
        .settings
        .replace(&document)
        .await
        .map_err(|error| persistence_error(error, &correlation_id))?;

    info!(
        event_name = "api.settings.replaced",
        correlation_id = %correlation_id,
        "settings document replaced"
    );
    Ok(Json(json!({ "status": "ok", "payload": document })))
}
