use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use forecast_core::domain::prediction::{
    ConfidenceLevel, Forecast, PredictionId, PredictionRecord, PredictionRequest,
};

use super::{PredictionRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, product_name, category, unit_price, discount, region,
        season, predicted_sales, confidence_level, growth_trend, insights,
        recommendation, created_at
 FROM predictions";

pub struct SqlPredictionRepository {
    pool: DbPool,
}

impl SqlPredictionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PredictionRecord, RepositoryError> {
    let confidence: String = decode(row.try_get("confidence_level"))?;
    let insights_json: String = decode(row.try_get("insights"))?;
    let created_at_str: String = decode(row.try_get("created_at"))?;

    let confidence_level = confidence
        .parse::<ConfidenceLevel>()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let insights: Vec<String> = serde_json::from_str(&insights_json)
        .map_err(|e| RepositoryError::Decode(format!("insights: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at `{created_at_str}`: {e}")))?;

    Ok(PredictionRecord {
        id: PredictionId(decode(row.try_get("id"))?),
        product_name: decode(row.try_get("product_name"))?,
        category: decode(row.try_get("category"))?,
        unit_price: decode(row.try_get("unit_price"))?,
        discount: decode(row.try_get("discount"))?,
        region: decode(row.try_get("region"))?,
        season: decode(row.try_get("season"))?,
        predicted_sales: decode(row.try_get("predicted_sales"))?,
        confidence_level,
        growth_trend: decode(row.try_get("growth_trend"))?,
        insights,
        recommendation: decode(row.try_get("recommendation"))?,
        created_at,
    })
}

#[async_trait::async_trait]
impl PredictionRepository for SqlPredictionRepository {
    async fn save(
        &self,
        request: &PredictionRequest,
        forecast: &Forecast,
    ) -> Result<PredictionRecord, RepositoryError> {
        let insights_json = serde_json::to_string(&forecast.insights)
            .map_err(|e| RepositoryError::Decode(format!("insights: {e}")))?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            "INSERT INTO predictions
                (product_name, category, unit_price, discount, region, season,
                 predicted_sales, confidence_level, growth_trend, insights,
                 recommendation, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.product_name)
        .bind(&request.category)
        .bind(request.unit_price)
        .bind(request.discount)
        .bind(&request.region)
        .bind(&request.season)
        .bind(forecast.predicted_sales)
        .bind(forecast.confidence_level.as_str())
        .bind(forecast.growth_trend)
        .bind(&insights_json)
        .bind(&forecast.recommendation)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find_by_id(id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("prediction {id} was not readable after insert"))
        })
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use forecast_core::domain::prediction::{ConfidenceLevel, Forecast, PredictionRequest};

    use super::SqlPredictionRepository;
    use crate::repositories::{PredictionRepository, RepositoryError};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn request(product_name: &str) -> PredictionRequest {
        PredictionRequest {
            product_name: product_name.to_string(),
            category: "electronics".to_string(),
            unit_price: 100.0,
            discount: 20.0,
            region: "west".to_string(),
            season: "winter".to_string(),
        }
    }

    fn forecast() -> Forecast {
        Forecast {
            predicted_sales: 46_956.8,
            confidence_level: ConfidenceLevel::High,
            growth_trend: 20.0,
            insights: vec![
                "Strong promotional impact due to high discount.".to_string(),
                "Strong seasonal demand expected in this period.".to_string(),
                "Region shows above-average performance historically.".to_string(),
            ],
            recommendation: "Strong growth expected; aggressively increase stock and marketing."
                .to_string(),
        }
    }

    #[tokio::test]
    async fn save_returns_the_stored_row() {
        let repo = SqlPredictionRepository::new(setup().await);

        let record = repo.save(&request("Laptop"), &forecast()).await.expect("save");

        assert_eq!(record.product_name, "Laptop");
        assert_eq!(record.forecast(), forecast());
        assert_eq!(record.unit_price, 100.0);

        let listed = repo.list_recent(10).await.expect("list");
        assert_eq!(listed, vec![record]);
    }

    #[tokio::test]
    async fn ids_increase_and_list_is_newest_first() {
        let repo = SqlPredictionRepository::new(setup().await);

        let first = repo.save(&request("A"), &forecast()).await.expect("first");
        let second = repo.save(&request("B"), &forecast()).await.expect("second");
        let third = repo.save(&request("C"), &forecast()).await.expect("third");
        assert!(first.id.0 < second.id.0 && second.id.0 < third.id.0);
        assert!(first.created_at <= third.created_at);

        let recent = repo.list_recent(2).await.expect("list");
        let names: Vec<&str> = recent.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["C", "B"]);
    }

    #[tokio::test]
    async fn list_on_empty_table_is_empty() {
        let repo = SqlPredictionRepository::new(setup().await);
        assert!(repo.list_recent(50).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn corrupt_insights_surface_as_decode_errors() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO predictions
                (product_name, category, unit_price, discount, region, season,
                 predicted_sales, confidence_level, growth_trend, insights,
                 recommendation, created_at)
             VALUES ('X', 'grocery', 1, 0, 'east', 'summer', 1, 'Medium', 5, 'not json',
                     'Maintain stock levels.', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("raw insert");

        let repo = SqlPredictionRepository::new(pool);
        let error = repo.list_recent(1).await.expect_err("decode should fail");
        assert!(matches!(error, RepositoryError::Decode(message) if message.contains("insights")));
    }
}
