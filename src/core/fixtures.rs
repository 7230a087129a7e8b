//! Shared stubs for the pipeline unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::core::{features::symptom_from_column, FeatureRow, InferenceError};
use crate::ml::{ClassLabel, Classifier};
use crate::models::{BundleParts, ModelBundle, PredictRequest};

/// Returns the same probabilities for every row
#[derive(Debug)]
pub(crate) struct FixedClassifier {
    pub labels: Vec<ClassLabel>,
    pub probabilities: Vec<f64>,
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn predict_proba(&self, _row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        Ok(self.probabilities.clone())
    }
}

#[derive(Debug)]
pub(crate) struct FailingClassifier {
    pub labels: Vec<ClassLabel>,
}

impl Classifier for FailingClassifier {
    fn classes(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn predict_proba(&self, _row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        Err(InferenceError::new("model exploded"))
    }
}

/// Two classes whose probabilities follow the `symptom_fever` column
#[derive(Debug)]
pub(crate) struct FeverClassifier {
    labels: Vec<ClassLabel>,
}

impl Default for FeverClassifier {
    fn default() -> Self {
        Self { labels: names(&["Common Cold", "Influenza"]) }
    }
}

impl Classifier for FeverClassifier {
    fn classes(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        let fever = row
            .get("symptom_fever")
            .and_then(|v| v.as_number())
            .unwrap_or(0.0);
        let flu = 0.2 + 0.6 * fever;
        Ok(vec![1.0 - flu, flu])
    }
}

pub(crate) fn names(labels: &[&str]) -> Vec<ClassLabel> {
    labels.iter().map(|l| ClassLabel::Name(l.to_string())).collect()
}

pub(crate) fn bundle_with(
    classifier: Arc<dyn Classifier>,
    columns: &[&str],
    importance: &[(&str, f64)],
) -> ModelBundle {
    let known_symptoms = columns
        .iter()
        .filter_map(|c| symptom_from_column(c))
        .map(str::to_string)
        .collect();
    let classes = classifier.classes().iter().map(|l| l.to_string()).collect();

    ModelBundle::new(BundleParts {
        classifier,
        known_symptoms,
        feature_columns: columns.iter().map(|c| c.to_string()).collect(),
        classes,
        label_encoder: None,
        symptom_importance: importance
            .iter()
            .map(|(s, v)| (s.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
        metrics: BTreeMap::new(),
        best_model_name: "Fixture".to_string(),
        importance_strategy: None,
    })
    .expect("fixture bundle is valid")
}

pub(crate) fn bundle_with_columns(columns: &[&str]) -> ModelBundle {
    bundle_with(Arc::new(FeverClassifier::default()), columns, &[])
}

pub(crate) fn request(age: u32, gender: &str, symptoms: &[&str], duration_days: u32) -> PredictRequest {
    PredictRequest {
        age,
        gender: gender.parse().expect("valid gender"),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        duration_days,
        lifestyle: None,
    }
}
