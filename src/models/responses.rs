use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::ml::ImportanceStrategy;
use crate::models::domain::{DiseaseProbability, Gender, ModelMetrics};

/// Response for the predict endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<DiseaseProbability>,
    pub important_symptoms: Vec<String>,
    pub input_summary: InputSummary,
    pub model_used: String,
}

/// Echo of the normalized request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSummary {
    pub age: u32,
    pub gender: Gender,
    pub duration_days: u32,
    pub symptom_count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub best_model: String,
    pub num_diseases: usize,
    pub num_symptoms: usize,
}

/// Vocabulary exposed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub symptoms: Vec<String>,
    pub diseases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSymptomImportance {
    pub symptom: String,
    pub importance: f64,
}

/// Model selection details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub best_model: String,
    pub metrics: BTreeMap<String, ModelMetrics>,
    pub importance_strategy: Option<ImportanceStrategy>,
    pub top_global_symptoms: Vec<GlobalSymptomImportance>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_symptoms: Option<Vec<String>>,
}
