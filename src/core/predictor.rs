use std::sync::Arc;
use crate::core::{
    error::PredictError,
    explanation::select_important_symptoms,
    features::build_feature_row,
    normalizer::normalize_symptoms,
    ranking::rank_predictions,
};
use crate::models::{DiseaseProbability, ModelBundle, PredictRequest, PredictionLimits};

/// Result of one pass through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub predictions: Vec<DiseaseProbability>,
    pub important_symptoms: Vec<String>,
    /// Normalized request symptoms
    pub symptoms: Vec<String>,
}

/// Prediction orchestrator - runs the inference pipeline against one bundle
///
/// # Pipeline Stages
/// 1. Symptom normalization and vocabulary check
/// 2. Feature row reconstruction
/// 3. Probability ranking
/// 4. Explanation selection
///
/// The bundle is shared read-only, so a `Predictor` can be cloned freely
/// across workers.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ModelBundle>,
    limits: PredictionLimits,
}

impl Predictor {
    pub fn new(bundle: Arc<ModelBundle>, limits: PredictionLimits) -> Self {
        Self { bundle, limits }
    }

    pub fn with_default_limits(bundle: Arc<ModelBundle>) -> Self {
        Self::new(bundle, PredictionLimits::default())
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn limits(&self) -> PredictionLimits {
        self.limits
    }

    /// Predict probable diseases for a request
    ///
    /// # Arguments
    /// * `request` - A request whose ranges were already validated
    ///
    /// # Returns
    /// The ranked diseases and the explanation list, or the first stage error
    pub fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictError> {
        let bundle = self.bundle.as_ref();

        // Stage 1: Normalize and check against the vocabulary
        let symptoms = normalize_symptoms(&request.symptoms, bundle.vocabulary())?;

        // Stage 2: Rebuild the training-time feature layout
        let row = build_feature_row(request, &symptoms, bundle);

        // Stage 3: Rank classes
        let predictions = rank_predictions(
            bundle.classifier(),
            bundle.label_encoder(),
            &row,
            self.limits.top_predictions,
        )?;

        // Stage 4: Explain
        let important_symptoms = select_important_symptoms(
            &symptoms,
            bundle.symptom_importance(),
            self.limits.explanation_size,
        );

        tracing::debug!(
            "Predicted {} classes from {} symptoms",
            predictions.len(),
            symptoms.len()
        );

        Ok(Prediction {
            predictions,
            important_symptoms,
            symptoms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ValidationError;
    use crate::core::fixtures::{bundle_with, names, request, FailingClassifier, FeverClassifier, FixedClassifier};

    const COLUMNS: [&str; 7] = [
        "age",
        "gender",
        "symptom_fever",
        "symptom_cough",
        "symptom_duration",
        "smoking",
        "alcohol",
    ];

    fn predictor() -> Predictor {
        let bundle = bundle_with(
            Arc::new(FeverClassifier::default()),
            &COLUMNS,
            &[("fever", 0.6), ("cough", 0.4)],
        );
        Predictor::with_default_limits(Arc::new(bundle))
    }

    #[test]
    fn test_predict_basic() {
        let result = predictor().predict(&request(30, "male", &["Fever"], 3)).unwrap();

        assert_eq!(result.symptoms, vec!["fever"]);
        assert_eq!(result.predictions[0].disease, "Influenza");
        assert_eq!(result.predictions[0].confidence, 0.8);
        assert_eq!(result.important_symptoms, vec!["fever", "cough"]);
    }

    #[test]
    fn test_case_and_whitespace_invariance() {
        let p = predictor();
        let a = p.predict(&request(30, "male", &["  Fever "], 3)).unwrap();
        let b = p.predict(&request(30, "male", &["fever"], 3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_idempotent() {
        let p = predictor();
        let req = request(44, "female", &["cough", "fever"], 9);
        assert_eq!(p.predict(&req).unwrap(), p.predict(&req).unwrap());
    }

    #[test]
    fn test_confidences_non_increasing() {
        let bundle = bundle_with(
            Arc::new(FixedClassifier {
                labels: names(&["A", "B", "C", "D", "E"]),
                probabilities: vec![0.1, 0.3, 0.2, 0.15, 0.25],
            }),
            &COLUMNS,
            &[],
        );
        let p = Predictor::with_default_limits(Arc::new(bundle));
        let result = p.predict(&request(30, "male", &["cough"], 3)).unwrap();

        assert_eq!(result.predictions.len(), 3);
        assert!(result
            .predictions
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        // Without scores every known symptom ranks at zero
        assert_eq!(result.important_symptoms, vec!["cough", "fever"]);
    }

    #[test]
    fn test_validation_errors() {
        let p = predictor();
        let err = p.predict(&request(30, "male", &["  "], 3)).unwrap_err();
        assert!(matches!(err, PredictError::Validation(ValidationError::NoSymptoms)));

        let err = p.predict(&request(30, "male", &["rash", "fever"], 3)).unwrap_err();
        match err {
            PredictError::Validation(ValidationError::UnknownSymptoms(unknown)) => {
                assert_eq!(unknown, vec!["rash"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inference_error() {
        let bundle = bundle_with(
            Arc::new(FailingClassifier { labels: names(&["A"]) }),
            &COLUMNS,
            &[],
        );
        let p = Predictor::with_default_limits(Arc::new(bundle));
        let err = p.predict(&request(30, "male", &["fever"], 3)).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_custom_limits() {
        let bundle = bundle_with(
            Arc::new(FeverClassifier::default()),
            &COLUMNS,
            &[("fever", 0.6), ("cough", 0.4)],
        );
        let p = Predictor::new(
            Arc::new(bundle),
            PredictionLimits { top_predictions: 1, explanation_size: 1 },
        );
        let result = p.predict(&request(30, "male", &["cough"], 3)).unwrap();
        assert_eq!(result.predictions.len(), 1);
        assert_eq!(result.important_symptoms, vec!["cough"]);
    }
}
