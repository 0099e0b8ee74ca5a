use crate::config::ScoringEngine;
use crate::domain::prediction::{round_to, ConfidenceLevel, Forecast, PredictionRequest};

use super::{Scorer, ScoringError};

const DEFAULT_CATEGORY_BASE: f64 = 20_000.0;

/// Multiplicative model over fixed lookup tables. Unknown categories, regions
/// and seasons fall back to neutral values rather than failing.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicScorer;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Factors {
    base: f64,
    price: f64,
    discount: f64,
    region: f64,
    season: f64,
}

impl Factors {
    fn for_request(request: &PredictionRequest) -> Self {
        Self {
            base: category_base(&request.category),
            price: (1.0 - (request.unit_price - 100.0) / 1000.0).clamp(0.5, 1.5),
            discount: 1.0 + (request.discount / 100.0) * 0.8,
            region: region_factor(&request.region),
            season: season_factor(&request.season),
        }
    }

    fn predicted_sales(&self) -> f64 {
        self.base * self.price * self.discount * self.region * self.season
    }
}

fn category_base(category: &str) -> f64 {
    match category.to_ascii_lowercase().as_str() {
        "electronics" => 32_000.0,
        "clothing" => 18_000.0,
        "grocery" => 25_000.0,
        "furniture" => 22_000.0,
        _ => DEFAULT_CATEGORY_BASE,
    }
}

fn region_factor(region: &str) -> f64 {
    match region.to_ascii_lowercase().as_str() {
        "north" => 1.05,
        "south" => 0.95,
        "east" => 1.00,
        "west" => 1.10,
        _ => 1.0,
    }
}

fn season_factor(season: &str) -> f64 {
    match season.to_ascii_lowercase().as_str() {
        "summer" => 1.10,
        "winter" => 1.15,
        "spring" => 1.05,
        "autumn" => 0.90,
        "monsoon" => 1.08,
        _ => 1.0,
    }
}

fn insights(request: &PredictionRequest, factors: &Factors) -> Vec<String> {
    let mut insights = Vec::with_capacity(4);

    insights.push(if request.discount >= 20.0 {
        "Strong promotional impact due to high discount."
    } else if request.discount > 0.0 {
        "Moderate uplift expected from discount strategy."
    } else {
        "No discount applied; rely on baseline demand and seasonality."
    });

    if factors.season > 1.05 {
        insights.push("Strong seasonal demand expected in this period.");
    } else if factors.season < 1.0 {
        insights.push("Off-season period; consider targeted campaigns.");
    }

    if factors.region > 1.05 {
        insights.push("Region shows above-average performance historically.");
    } else if factors.region < 1.0 {
        insights.push("Region historically underperforms; conservative forecast applied.");
    }

    if factors.price < 0.8 {
        insights.push("High unit price may limit demand; consider adjusting pricing.");
    } else if factors.price > 1.2 {
        insights.push("Competitive pricing likely to support higher volume.");
    }

    insights.into_iter().map(str::to_string).collect()
}

fn recommendation(growth: f64) -> &'static str {
    if growth >= 0.18 {
        "Strong growth expected; aggressively increase stock and marketing."
    } else if growth < 0.08 {
        "Maintain current stock levels and monitor performance."
    } else {
        "Increase stock levels to meet predicted demand."
    }
}

impl Scorer for HeuristicScorer {
    fn engine(&self) -> ScoringEngine {
        ScoringEngine::Heuristic
    }

    fn score(&self, request: &PredictionRequest) -> Result<Forecast, ScoringError> {
        let factors = Factors::for_request(request);

        let (growth, confidence_level) = if factors.discount > 1.1 && factors.season >= 1.1 {
            (0.20, ConfidenceLevel::High)
        } else if factors.discount > 1.05 {
            (0.12, ConfidenceLevel::Medium)
        } else {
            (0.05, ConfidenceLevel::Medium)
        };

        Ok(Forecast {
            predicted_sales: round_to(factors.predicted_sales(), 2),
            confidence_level,
            growth_trend: round_to(growth * 100.0, 1),
            insights: insights(request, &factors),
            recommendation: recommendation(growth).to_string(),
        })
    }
}
