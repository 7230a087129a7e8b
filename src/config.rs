use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::Path;
use crate::models::PredictionLimits;

const ENV_PREFIX: &str = "PREDICTOR";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    #[serde(default)]
    pub prediction: PredictionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Path of the JSON bundle written by the trainer
    pub bundle_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionSettings {
    #[serde(default = "default_top_predictions")]
    pub top_predictions: usize,
    #[serde(default = "default_explanation_size")]
    pub explanation_size: usize,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            top_predictions: default_top_predictions(),
            explanation_size: default_explanation_size(),
        }
    }
}

impl From<&PredictionSettings> for PredictionLimits {
    fn from(settings: &PredictionSettings) -> Self {
        PredictionLimits {
            top_predictions: settings.top_predictions.max(1),
            explanation_size: settings.explanation_size,
        }
    }
}

fn default_top_predictions() -> usize { 3 }
fn default_explanation_size() -> usize { 3 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

/// Built-in values for every setting, lowest precedence
fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("model.bundle_path", "model/bundle.json")?
        .set_default("prediction.top_predictions", 3)?
        .set_default("prediction.explanation_size", 3)?
        .set_default("logging.level", default_log_level())?
        .set_default("logging.format", default_log_format())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with PREDICTOR__)
    /// 4. `MODEL_PATH`, which overrides the bundle path
    pub fn load() -> Result<Self, ConfigError> {
        let settings = with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., PREDICTOR__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_model_path(settings, std::env::var("MODEL_PATH").ok())?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_from_with(path, std::env::var("MODEL_PATH").ok())
    }

    fn load_from_with<P: AsRef<Path>>(path: P, model_path: Option<String>) -> Result<Self, ConfigError> {
        let settings = with_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        apply_model_path(settings, model_path)?.try_deserialize()
    }
}

/// Layer an explicit bundle path over the loaded configuration
fn apply_model_path(settings: Config, model_path: Option<String>) -> Result<Config, ConfigError> {
    match model_path.filter(|p| !p.trim().is_empty()) {
        Some(path) => Config::builder()
            .add_source(settings)
            .set_override("model.bundle_path", path)?
            .build(),
        None => Ok(settings),
    }
}
