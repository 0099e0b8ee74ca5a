//! Random-forest scoring engine trained on a synthetic data set.
//!
//! The trained [`ForestBundle`] (forest plus the three categorical encoders)
//! is cached as JSON next to the service and reused on every start.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ScoringEngine;
use crate::domain::prediction::{round_to, ConfidenceLevel, Forecast, PredictionRequest};

use super::encoder::LabelEncoder;
use super::forest::{FeatureRow, RandomForest};
use super::{Scorer, ScoringError};

pub const TRAINING_SEED: u64 = 42;
pub const TRAINING_SAMPLES: usize = 200;
pub const TREE_COUNT: usize = 100;

const CATEGORIES: [&str; 4] = ["electronics", "clothing", "grocery", "furniture"];
const REGIONS: [&str; 4] = ["north", "south", "east", "west"];
const SEASONS: [&str; 4] = ["summer", "winter", "monsoon", "spring"];

const INSIGHTS: [&str; 3] = [
    "Prediction generated using Random Forest regression model.",
    "Model learned price, discount, region, and season patterns.",
    "Higher discount positively impacts demand.",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestBundle {
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub category: LabelEncoder,
    pub region: LabelEncoder,
    pub season: LabelEncoder,
    pub model: RandomForest,
}

struct SyntheticSample {
    category: &'static str,
    unit_price: f64,
    discount: f64,
    region: &'static str,
    season: &'static str,
    sales: f64,
}

fn synthetic_samples(rng: &mut StdRng) -> Vec<SyntheticSample> {
    let prices: Vec<f64> =
        (0..TRAINING_SAMPLES).map(|_| f64::from(rng.gen_range(100_u32..1200))).collect();
    let discounts: Vec<f64> =
        (0..TRAINING_SAMPLES).map(|_| f64::from(rng.gen_range(0_u32..40))).collect();
    let sales: Vec<f64> =
        (0..TRAINING_SAMPLES).map(|_| f64::from(rng.gen_range(15_000_u32..60_000))).collect();

    (0..TRAINING_SAMPLES)
        .map(|i| SyntheticSample {
            category: CATEGORIES[i % CATEGORIES.len()],
            unit_price: prices[i],
            discount: discounts[i],
            region: REGIONS[i % REGIONS.len()],
            season: SEASONS[i % SEASONS.len()],
            sales: sales[i],
        })
        .collect()
}

impl ForestBundle {
    pub fn train(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = synthetic_samples(&mut rng);

        let category = LabelEncoder::fit(samples.iter().map(|sample| sample.category));
        let region = LabelEncoder::fit(samples.iter().map(|sample| sample.region));
        let season = LabelEncoder::fit(samples.iter().map(|sample| sample.season));

        let mut features = Vec::with_capacity(samples.len());
        let mut targets = Vec::with_capacity(samples.len());
        for sample in &samples {
            // Encoders were fit on these samples, so every label is known.
            features.push([
                category.transform("category", sample.category).unwrap_or_default() as f64,
                sample.unit_price,
                sample.discount,
                region.transform("region", sample.region).unwrap_or_default() as f64,
                season.transform("season", sample.season).unwrap_or_default() as f64,
            ]);
            targets.push(sample.sales);
        }

        let model = RandomForest::fit(&features, &targets, TREE_COUNT, &mut rng);
        Self { trained_at: Utc::now(), seed, category, region, season, model }
    }

    pub fn load(path: &Path) -> Result<Self, ScoringError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ScoringError::Artifact(format!("could not read `{}`: {error}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            ScoringError::Artifact(format!("could not parse `{}`: {error}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ScoringError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| {
                ScoringError::Artifact(format!("could not create `{}`: {error}", parent.display()))
            })?;
        }
        let encoded = serde_json::to_vec(self)
            .map_err(|error| ScoringError::Artifact(format!("could not encode model: {error}")))?;
        fs::write(path, encoded).map_err(|error| {
            ScoringError::Artifact(format!("could not write `{}`: {error}", path.display()))
        })
    }

    fn features(&self, request: &PredictionRequest) -> Result<FeatureRow, ScoringError> {
        Ok([
            self.category.transform("category", &request.category)? as f64,
            request.unit_price,
            request.discount,
            self.region.transform("region", &request.region)? as f64,
            self.season.transform("season", &request.season)? as f64,
        ])
    }
}

#[derive(Clone, Debug)]
pub struct ForestScorer {
    bundle: ForestBundle,
}

impl ForestScorer {
    pub fn new(bundle: ForestBundle) -> Self {
        Self { bundle }
    }

    /// Loads the cached bundle at `path`, or trains and caches a new one when
    /// the file is missing or unreadable.
    pub fn load_or_train(path: &Path) -> Result<Self, ScoringError> {
        if path.exists() {
            match ForestBundle::load(path) {
                Ok(bundle) => {
                    info!(
                        event_name = "scoring.model.loaded",
                        correlation_id = "bootstrap",
                        model_path = %path.display(),
                        trees = bundle.model.tree_count(),
                        "random forest artifact loaded"
                    );
                    return Ok(Self::new(bundle));
                }
                Err(error) => {
                    warn!(
                        event_name = "scoring.model.unreadable",
                        correlation_id = "bootstrap",
                        model_path = %path.display(),
                        error = %error,
                        "cached random forest artifact is unusable; retraining"
                    );
                }
            }
        }

        let bundle = ForestBundle::train(TRAINING_SEED);
        bundle.save(path)?;
        info!(
            event_name = "scoring.model.trained",
            correlation_id = "bootstrap",
            model_path = %path.display(),
            trees = bundle.model.tree_count(),
            samples = TRAINING_SAMPLES,
            "random forest trained on synthetic data and cached"
        );
        Ok(Self::new(bundle))
    }

    pub fn bundle(&self) -> &ForestBundle {
        &self.bundle
    }
}

impl Scorer for ForestScorer {
    fn engine(&self) -> ScoringEngine {
        ScoringEngine::Forest
    }

    fn score(&self, request: &PredictionRequest) -> Result<Forecast, ScoringError> {
        let row = self.bundle.features(request)?;
        let prediction = self.bundle.model.predict(&row).max(0.0);

        // Interpretation depends on the discount alone, not on the prediction.
        let (confidence_level, growth_trend) = if request.discount >= 20.0 {
            (ConfidenceLevel::High, 18.0)
        } else if request.discount > 5.0 {
            (ConfidenceLevel::Medium, 10.0)
        } else {
            (ConfidenceLevel::Medium, 5.0)
        };

        let recommendation = if growth_trend >= 15.0 {
            "Increase inventory and marketing efforts."
        } else {
            "Maintain stock levels."
        };

        Ok(Forecast {
            predicted_sales: round_to(prediction, 2),
            confidence_level,
            growth_trend,
            insights: INSIGHTS.iter().map(|insight| insight.to_string()).collect(),
            recommendation: recommendation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use tempfile::TempDir;

    use crate::domain::prediction::{ConfidenceLevel, PredictionRequest};
    use crate::scoring::{Scorer, ScoringError};

    use super::{ForestBundle, ForestScorer, TRAINING_SEED, TREE_COUNT};

    fn trained() -> &'static ForestBundle {
        static BUNDLE: OnceLock<ForestBundle> = OnceLock::new();
        BUNDLE.get_or_init(|| ForestBundle::train(TRAINING_SEED))
    }

    fn request(category: &str, discount: f64, season: &str) -> PredictionRequest {
        PredictionRequest {
            product_name: "Blender".to_string(),
            category: category.to_string(),
            unit_price: 450.0,
            discount,
            region: "east".to_string(),
            season: season.to_string(),
        }
    }

    #[test]
    fn training_fits_closed_vocabularies() {
        let bundle = trained();

        assert_eq!(bundle.model.tree_count(), TREE_COUNT);
        assert_eq!(bundle.category.classes(), ["clothing", "electronics", "furniture", "grocery"]);
        assert_eq!(bundle.region.classes(), ["east", "north", "south", "west"]);
        assert_eq!(bundle.season.classes(), ["monsoon", "spring", "summer", "winter"]);
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let again = ForestBundle::train(TRAINING_SEED);
        assert_eq!(again.model, trained().model);
    }

    #[test]
    fn predictions_stay_within_the_synthetic_sales_range() {
        let scorer = ForestScorer::new(trained().clone());
        let forecast = scorer.score(&request("Electronics", 25.0, "winter")).expect("score");

        assert!((15_000.0..60_000.0).contains(&forecast.predicted_sales));
        assert_eq!(forecast.confidence_level, ConfidenceLevel::High);
        assert_eq!(forecast.growth_trend, 18.0);
        assert_eq!(forecast.recommendation, "Increase inventory and marketing efforts.");
        assert_eq!(forecast.insights.len(), 3);
    }

    #[test]
    fn interpretation_depends_only_on_discount() {
        let scorer = ForestScorer::new(trained().clone());

        let moderate = scorer.score(&request("grocery", 10.0, "summer")).expect("moderate");
        assert_eq!(moderate.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(moderate.growth_trend, 10.0);
        assert_eq!(moderate.recommendation, "Maintain stock levels.");

        let none = scorer.score(&request("grocery", 5.0, "summer")).expect("none");
        assert_eq!(none.growth_trend, 5.0);
    }

    #[test]
    fn unseen_categories_and_seasons_are_rejected() {
        let scorer = ForestScorer::new(trained().clone());

        assert_eq!(
            scorer.score(&request("toys", 10.0, "summer")),
            Err(ScoringError::UnknownLabel { field: "category", value: "toys".to_string() })
        );
        assert_eq!(
            scorer.score(&request("grocery", 10.0, "autumn")),
            Err(ScoringError::UnknownLabel { field: "season", value: "autumn".to_string() })
        );
    }

    #[test]
    fn load_or_train_caches_and_reuses_the_artifact() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("models").join("rf_model.json");

        let first = ForestScorer::load_or_train(&path).expect("train");
        assert!(path.exists());

        let second = ForestScorer::load_or_train(&path).expect("load");
        assert_eq!(first.bundle(), second.bundle());
    }

    #[test]
    fn corrupt_artifact_is_replaced() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("rf_model.json");
        std::fs::write(&path, "not json").expect("write corrupt artifact");

        let scorer = ForestScorer::load_or_train(&path).expect("retrain");
        assert_eq!(scorer.bundle().model.tree_count(), TREE_COUNT);
        assert!(ForestBundle::load(&path).is_ok());
    }
}
