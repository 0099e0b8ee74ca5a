//! `GET /app`: a page that frames the externally hosted frontend.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Html, routing::get, Router};
use forecast_core::config::FrontendConfig;
use tera::{Context, Tera};
use tracing::error;

const TEMPLATE_NAME: &str = "embed.html";
pub const FRAME_HEIGHT: u32 = 1000;

#[derive(Clone)]
pub struct EmbedState {
    templates: Arc<Tera>,
    frontend: FrontendConfig,
}

impl EmbedState {
    pub fn new(frontend: FrontendConfig) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, include_str!("../../../templates/embed.html"))?;
        Ok(Self { templates: Arc::new(tera), frontend })
    }
}

pub fn router(state: EmbedState) -> Router {
    Router::new().route("/app", get(embed_page)).with_state(state)
}

pub async fn embed_page(
    State(state): State<EmbedState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = Context::new();
    context.insert("title", &state.frontend.title);
    context.insert("embed_url", &state.frontend.embed_url);
    context.insert("height", &FRAME_HEIGHT);

    state.templates.render(TEMPLATE_NAME, &context).map(Html).map_err(|error| {
        error!(
            event_name = "embed.render.failed",
            correlation_id = "embed",
            error = %error,
            "embed page render failed"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Embed page unavailable</h1>".to_string()))
    })
}
