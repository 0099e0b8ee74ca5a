use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use forecast_db::DbPool;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    engine: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, engine: &'static str) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
        .with_state(HealthState { db_pool, engine })
}

pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Sales forecasting API is running." }))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("scoring engine `{}` loaded", state.engine),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM predictions").fetch_one(pool).await {
        Ok(count) => {
            HealthCheck { status: "ready", detail: format!("{count} predictions stored") }
        }
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
