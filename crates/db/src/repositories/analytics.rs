use sqlx::Row;

use forecast_core::domain::analytics::{
    month_label, AnalyticsSummary, CategoryShare, MonthlyOrders, RegionPerformance,
    CUSTOMERS_PER_PRODUCT,
};
use forecast_core::domain::prediction::round_to;

use super::{AnalyticsRepository, RepositoryError};
use crate::DbPool;

/// Aggregates computed on demand from the `predictions` table.
pub struct SqlAnalyticsRepository {
    pool: DbPool,
}

impl SqlAnalyticsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn totals(&self) -> Result<(i64, i64, f64), RepositoryError> {
        let row = sqlx::query(
            "SELECT
                 COUNT(*) AS total_orders,
                 COUNT(DISTINCT product_name) AS distinct_products,
                 AVG(growth_trend) AS avg_growth
             FROM predictions",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_orders: i64 =
            row.try_get("total_orders").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let distinct_products: i64 = row
            .try_get("distinct_products")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let avg_growth: Option<f64> =
            row.try_get("avg_growth").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok((total_orders, distinct_products, avg_growth.unwrap_or(0.0)))
    }

    async fn categories(&self) -> Result<Vec<CategoryShare>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT category AS name, COUNT(*) AS value
             FROM predictions
             GROUP BY category
             ORDER BY value DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CategoryShare {
                    name: row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    value: row
                        .try_get("value")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn regions(&self) -> Result<Vec<RegionPerformance>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT region AS name,
                    SUM(predicted_sales) AS sales,
                    AVG(growth_trend) AS growth
             FROM predictions
             GROUP BY region
             ORDER BY sales DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let sales: Option<f64> =
                    row.try_get("sales").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let growth: Option<f64> =
                    row.try_get("growth").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(RegionPerformance {
                    name: row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    sales: sales.unwrap_or(0.0),
                    growth: round_to(growth.unwrap_or(0.0), 1),
                })
            })
            .collect()
    }

    async fn monthly_orders(&self) -> Result<Vec<MonthlyOrders>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT substr(created_at, 1, 7) AS year_month, COUNT(*) AS orders
             FROM predictions
             GROUP BY year_month
             ORDER BY year_month ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let year_month: String = row
                    .try_get("year_month")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(MonthlyOrders {
                    month: month_label(&year_month),
                    orders: row
                        .try_get("orders")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AnalyticsRepository for SqlAnalyticsRepository {
    async fn summary(&self) -> Result<AnalyticsSummary, RepositoryError> {
        let (total_orders, distinct_products, avg_growth) = self.totals().await?;

        Ok(AnalyticsSummary {
            growth_rate: round_to(avg_growth, 1),
            active_customers: distinct_products * CUSTOMERS_PER_PRODUCT,
            total_orders,
            categories: self.categories().await?,
            regions: self.regions().await?,
            monthly_orders: self.monthly_orders().await?,
        })
    }
}
