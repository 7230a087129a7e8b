// Model exports
pub mod bundle;
pub mod domain;
pub mod requests;
pub mod responses;

pub use bundle::{BundleArtifact, BundleParts, ModelBundle, SchemaError, SymptomImportance, SymptomVocabulary};
pub use domain::{DiseaseProbability, Gender, Lifestyle, ModelMetrics, PredictionLimits};
pub use requests::PredictRequest;
pub use responses::{
    ErrorResponse, GlobalSymptomImportance, HealthResponse, InputSummary, MetadataResponse,
    ModelInfoResponse, PredictResponse,
};
