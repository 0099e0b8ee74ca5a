use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use forecast_core::errors::{ApplicationError, DomainError};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::api::{correlation_id, ApiError};

const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct UploadState {
    upload_dir: Arc<PathBuf>,
}

impl UploadState {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self { upload_dir: Arc::new(upload_dir.into()) }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub path: String,
}

pub fn router(state: UploadState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// `<YYYYmmddHHMMSS>_<basename>`, or `None` when the client sent no usable name.
pub fn stored_name(client_name: &str, now: DateTime<Utc>) -> Option<String> {
    // Clients on Windows send backslash-separated paths.
    let normalized = client_name.replace('\\', "/");
    let basename = Path::new(&normalized).file_name()?.to_str()?.trim();
    if basename.is_empty() || basename == ".." {
        return None;
    }
    Some(format!("{}_{basename}", now.format("%Y%m%d%H%M%S")))
}

fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiError {
    ApiError::new(DomainError::InvalidRequest(message.into()).into(), correlation_id)
}

fn write_error(error: std::io::Error, path: &Path, correlation_id: &str) -> ApiError {
    error!(
        event_name = "upload.write.failed",
        correlation_id = %correlation_id,
        path = %path.display(),
        error = %error,
        "failed to write uploaded file"
    );
    ApiError::new(
        ApplicationError::Upload(format!("could not write `{}`: {error}", path.display())),
        correlation_id,
    )
}

/// Copies the field into `file`, returning the number of bytes written.
async fn stream_field(
    field: &mut Field<'_>,
    file: &mut tokio::fs::File,
    target: &Path,
    correlation_id: &str,
) -> Result<u64, ApiError> {
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| bad_request(format!("upload interrupted: {error}"), correlation_id))?
    {
        file.write_all(&chunk).await.map_err(|error| write_error(error, target, correlation_id))?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await.map_err(|error| write_error(error, target, correlation_id))?;
    Ok(bytes_written)
}

pub async fn upload(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let correlation_id = correlation_id();

    loop {
        let field = multipart.next_field().await.map_err(|error| {
            bad_request(format!("malformed multipart body: {error}"), &correlation_id)
        })?;
        let Some(mut field) = field else {
            return Err(bad_request("multipart field `file` is required", &correlation_id));
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let saved_name = field
            .file_name()
            .and_then(|name| stored_name(name, Utc::now()))
            .ok_or_else(|| bad_request("No filename provided", &correlation_id))?;
        let target = state.upload_dir.join(&saved_name);

        let mut file = tokio::fs::File::create(&target)
            .await
            .map_err(|error| write_error(error, &target, &correlation_id))?;
        let bytes_written =
            match stream_field(&mut field, &mut file, &target, &correlation_id).await {
                Ok(bytes_written) => bytes_written,
                Err(upload_error) => {
                    drop(file);
                    if let Err(error) = tokio::fs::remove_file(&target).await {
                        warn!(
                            event_name = "upload.cleanup.failed",
                            correlation_id = %correlation_id,
                            path = %target.display(),
                            error = %error,
                            "failed to remove partial upload"
                        );
                    }
                    return Err(upload_error);
                }
            };

        info!(
            event_name = "upload.stored",
            correlation_id = %correlation_id,
            path = %target.display(),
            bytes = bytes_written,
            "uploaded file stored"
        );

        let public_dir = state.upload_dir.to_string_lossy().trim_end_matches('/').to_string();
        return Ok(Json(UploadResponse {
            status: "ok",
            path: format!("{public_dir}/{saved_name}"),
        }));
    }
}
