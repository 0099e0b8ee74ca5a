use chrono::{SecondsFormat, Utc};
use sqlx::Row;

use forecast_core::domain::settings::SettingsDocument;

use super::{RepositoryError, SettingsRepository};
use crate::DbPool;

const SETTINGS_ROW_ID: i64 = 1;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn load(&self) -> Result<Option<SettingsDocument>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM settings WHERE id = ?")
            .bind(SETTINGS_ROW_ID)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String =
            row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|e| RepositoryError::Decode(format!("settings payload: {e}")))
    }

    async fn replace(&self, document: &SettingsDocument) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(document)
            .map_err(|e| RepositoryError::Decode(format!("settings payload: {e}")))?;

        sqlx::query(
            "INSERT INTO settings (id, payload, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at",
        )
        .bind(SETTINGS_ROW_ID)
        .bind(payload)
        .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
