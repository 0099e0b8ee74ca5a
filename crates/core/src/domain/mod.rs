pub mod analytics;
pub mod prediction;
pub mod settings;
