use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::{self, ApiState};
use crate::bootstrap::Application;
use crate::embed::{self, EmbedState};
use crate::health;
use crate::upload::{self, UploadState};

pub fn router(app: &Application) -> Result<Router, tera::Error> {
    let embed_state = EmbedState::new(app.config.frontend.clone())?;

    Ok(Router::new()
        .merge(health::router(app.db_pool.clone(), app.scoring.engine().as_str()))
        .merge(api::router(ApiState::new(app.db_pool.clone(), app.scoring.clone())))
        .merge(upload::router(UploadState::new(&app.config.server.upload_dir)))
        .merge(embed::router(embed_state))
        .layer(CorsLayer::permissive()))
}
