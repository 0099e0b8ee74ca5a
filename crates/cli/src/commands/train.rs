use std::path::Path;

use forecast_core::scoring::regression::{ForestBundle, TRAINING_SAMPLES, TRAINING_SEED};
use serde_json::json;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "train";

pub fn run(force: bool) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let path = Path::new(&config.scoring.model_path);

    if !force && path.exists() {
        if let Ok(existing) = ForestBundle::load(path) {
            return CommandResult::success_with(
                COMMAND,
                "model artifact already present; pass --force to retrain",
                Some(json!({
                    "model_path": config.scoring.model_path,
                    "trees": existing.model.tree_count(),
                    "trained_at": existing.trained_at.to_rfc3339(),
                    "retrained": false,
                })),
            );
        }
    }

    let bundle = ForestBundle::train(TRAINING_SEED);
    if let Err(error) = bundle.save(path) {
        return CommandResult::failure(COMMAND, "artifact_write", error.to_string(), 6);
    }

    CommandResult::success_with(
        COMMAND,
        format!("trained random forest on {TRAINING_SAMPLES} synthetic samples"),
        Some(json!({
            "model_path": config.scoring.model_path,
            "trees": bundle.model.tree_count(),
            "trained_at": bundle.trained_at.to_rfc3339(),
            "retrained": true,
        })),
    )
}
