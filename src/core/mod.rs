// Core pipeline exports
pub mod error;
pub mod explanation;
pub mod features;
pub mod normalizer;
pub mod predictor;
pub mod ranking;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::{InferenceError, PredictError, ValidationError};
pub use explanation::select_important_symptoms;
pub use features::{build_feature_row, FeatureRow, FeatureSchema, FeatureValue};
pub use normalizer::{clean_symptoms, normalize_symptoms};
pub use predictor::{Prediction, Predictor};
pub use ranking::{decode_label, rank_predictions, round_confidence};
