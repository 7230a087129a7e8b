//! Estimators and the classifier capability the prediction pipeline runs on.
//!
//! The pipeline only ever sees [`Classifier`]: a list of native class labels
//! and a `predict_proba` over one [`FeatureRow`]. Training works on dense
//! `ndarray` matrices produced by the [`ColumnTransformer`], fits the linfa
//! estimators wrapped in this module and keeps the winner in a
//! [`FittedPipeline`].

pub mod forest;
pub mod logistic;
pub mod naive_bayes;
pub mod pipeline;
pub mod preprocess;

use linfa::Dataset;
use ndarray::{Array1, Array2, Axis, Ix1};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use crate::core::{FeatureRow, InferenceError};

pub use forest::{FittedForest, RandomForest};
pub use logistic::{FittedLogistic, LogisticRegression};
pub use naive_bayes::{FittedGaussianNb, GaussianNb};
pub use pipeline::{CandidateModel, FittedModel, FittedPipeline};
pub use preprocess::ColumnTransformer;

/// Opaque probability model consumed by the prediction pipeline
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Native class labels, in the order `predict_proba` reports them
    fn classes(&self) -> &[ClassLabel];

    /// One probability per entry of [`Classifier::classes`]
    fn predict_proba(&self, row: &FeatureRow) -> Result<Vec<f64>, InferenceError>;
}

/// A classifier's own name for a class
///
/// Models trained on encoded targets report `Encoded` labels which the
/// bundle's [`LabelEncoder`] maps back to disease names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Encoded(u32),
    Name(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Encoded(code) => write!(f, "{}", code),
            ClassLabel::Name(name) => f.write_str(name),
        }
    }
}

/// Sorted, deduplicated class names indexed by their encoded value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Build from a class list; order and duplicates are normalized
    pub fn from_classes(classes: Vec<String>) -> Self {
        Self::fit(classes)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Native labels of a model trained on this encoding
    pub fn encoded_labels(&self) -> Vec<ClassLabel> {
        (0..self.classes.len() as u32).map(ClassLabel::Encoded).collect()
    }
}

/// How global feature importance is read off a fitted estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceStrategy {
    /// Mean impurity decrease of tree ensembles
    TreeImpurity,
    /// Mean absolute coefficient across classes
    LinearCoefficients,
    /// `1 / n_features` for every feature
    Uniform,
}

impl ImportanceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportanceStrategy::TreeImpurity => "tree_impurity",
            ImportanceStrategy::LinearCoefficients => "linear_coefficients",
            ImportanceStrategy::Uniform => "uniform",
        }
    }
}

impl fmt::Display for ImportanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FitError {
    #[error("training matrix is empty")]
    EmptyInput,

    #[error("{rows} rows but {targets} targets")]
    ShapeMismatch { rows: usize, targets: usize },

    #[error("target {0} is out of range for {1} classes")]
    InvalidTarget(usize, usize),

    #[error("class {0} has no training rows")]
    MissingClass(usize),

    #[error("training matrix contains non-finite values")]
    NonFinite,

    #[error("model expects {expected} features but the transformer produces {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("{labels} class labels for a model with {classes} classes")]
    LabelMismatch { labels: usize, classes: usize },

    #[error("column '{0}' mixes numeric and categorical values")]
    MixedColumn(String),

    #[error("{model} failed to fit: {message}")]
    Estimator { model: &'static str, message: String },
}

/// Validate a dense training set before fitting
pub fn check_training_input(x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<(), FitError> {
    if x.nrows() == 0 || x.ncols() == 0 || n_classes == 0 {
        return Err(FitError::EmptyInput);
    }
    if x.nrows() != y.len() {
        return Err(FitError::ShapeMismatch { rows: x.nrows(), targets: y.len() });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }
    let mut seen = vec![false; n_classes];
    for &target in y {
        if target >= n_classes {
            return Err(FitError::InvalidTarget(target, n_classes));
        }
        seen[target] = true;
    }
    match seen.iter().position(|s| !s) {
        Some(missing) => Err(FitError::MissingClass(missing)),
        None => Ok(()),
    }
}

/// Pair a checked training matrix with its encoded targets
pub(crate) fn training_set(x: &Array2<f64>, y: &[usize]) -> Dataset<f64, usize, Ix1> {
    Dataset::new(x.to_owned(), Array1::from(y.to_vec()))
}

/// A single feature vector as a one-row matrix
pub(crate) fn single_row(features: &[f64]) -> Array2<f64> {
    Array1::from(features.to_vec()).insert_axis(Axis(0))
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_label_encoder_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["Migraine", "Asthma", "Migraine"]);
        assert_eq!(encoder.classes(), &["Asthma".to_string(), "Migraine".to_string()]);
        assert_eq!(encoder.encode("Migraine"), Some(1));
        assert_eq!(encoder.encode("Flu"), None);
        assert_eq!(encoder.decode(0), Some("Asthma"));
        assert_eq!(encoder.encoded_labels(), vec![ClassLabel::Encoded(0), ClassLabel::Encoded(1)]);
    }

    #[test]
    fn test_class_label_serde() {
        let labels: Vec<ClassLabel> = serde_json::from_str(r#"[0, "Asthma"]"#).unwrap();
        assert_eq!(labels, vec![ClassLabel::Encoded(0), ClassLabel::Name("Asthma".to_string())]);
        assert_eq!(labels[1].to_string(), "Asthma");
    }

    #[test]
    fn test_importance_strategy_names() {
        let json = serde_json::to_string(&ImportanceStrategy::TreeImpurity).unwrap();
        assert_eq!(json, "\"tree_impurity\"");
        assert_eq!(ImportanceStrategy::LinearCoefficients.to_string(), "linear_coefficients");
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }

    #[test]
    fn test_single_row_shape() {
        let row = single_row(&[1.0, 2.0, 3.0]);
        assert_eq!(row.dim(), (1, 3));
        assert_eq!(row[[0, 2]], 3.0);
    }

    #[test]
    fn test_check_training_input() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        assert!(check_training_input(&x, &[0, 1], 2).is_ok());
        assert!(matches!(check_training_input(&x, &[0], 2), Err(FitError::ShapeMismatch { .. })));
        assert!(matches!(check_training_input(&x, &[0, 0], 2), Err(FitError::MissingClass(1))));
        assert!(matches!(check_training_input(&x, &[0, 3], 2), Err(FitError::InvalidTarget(3, 2))));
    }
}
