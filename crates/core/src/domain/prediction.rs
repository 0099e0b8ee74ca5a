use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown confidence level `{other}`")))
            }
        }
    }
}

/// Product attributes submitted for scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub product_name: String,
    pub category: String,
    pub unit_price: f64,
    pub discount: f64,
    pub region: String,
    pub season: String,
}

impl PredictionRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("productName", &self.product_name),
            ("category", &self.category),
            ("region", &self.region),
            ("season", &self.season),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidRequest(format!("{field} must not be empty")));
            }
        }

        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(DomainError::InvalidRequest(
                "unitPrice must be a finite number greater than or equal to zero".to_string(),
            ));
        }

        if !self.discount.is_finite() || !(0.0..=100.0).contains(&self.discount) {
            return Err(DomainError::InvalidRequest(
                "discount must be a percentage in range 0..=100".to_string(),
            ));
        }

        Ok(())
    }
}

/// Scoring output, shared by both scoring engines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub predicted_sales: f64,
    pub confidence_level: ConfidenceLevel,
    /// Percent, e.g. `12.0`.
    pub growth_trend: f64,
    pub insights: Vec<String>,
    pub recommendation: String,
}

/// A stored prediction row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: PredictionId,
    pub product_name: String,
    pub category: String,
    pub unit_price: f64,
    pub discount: f64,
    pub region: String,
    pub season: String,
    pub predicted_sales: f64,
    pub confidence_level: ConfidenceLevel,
    pub growth_trend: f64,
    pub insights: Vec<String>,
    pub recommendation: String,
    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn forecast(&self) -> Forecast {
        Forecast {
            predicted_sales: self.predicted_sales,
            confidence_level: self.confidence_level,
            growth_trend: self.growth_trend,
            insights: self.insights.clone(),
            recommendation: self.recommendation.clone(),
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
