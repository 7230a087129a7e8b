//! Symptom Predictor - disease-probability inference service
//!
//! This library loads a trained model bundle and turns a patient's reported
//! symptoms into ranked disease probabilities with a short explanation of
//! which symptoms drove the top prediction. The `training` module holds the
//! offline tooling that produces the bundle.

pub mod config;
pub mod core;
pub mod logging;
pub mod ml;
pub mod models;
pub mod routes;
pub mod training;

// Re-export commonly used types
pub use crate::core::{PredictError, Prediction, Predictor};
pub use crate::models::{ModelBundle, PredictRequest, PredictResponse, PredictionLimits};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let limits = PredictionLimits::default();
        assert_eq!(limits.top_predictions, 3);
        assert_eq!(limits.explanation_size, 3);
    }
}
