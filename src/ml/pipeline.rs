use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::core::{FeatureRow, InferenceError};
use crate::ml::{
    ClassLabel, Classifier, ColumnTransformer, FitError, FittedForest, FittedGaussianNb,
    FittedLogistic, GaussianNb, ImportanceStrategy, LogisticRegression, RandomForest,
};

/// Untrained estimator with its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GaussianNb(GaussianNb),
}

impl CandidateModel {
    /// Candidates in selection order
    pub fn default_candidates() -> Vec<CandidateModel> {
        vec![
            CandidateModel::LogisticRegression(LogisticRegression::default()),
            CandidateModel::RandomForest(RandomForest::default()),
            CandidateModel::GaussianNb(GaussianNb::default()),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CandidateModel::LogisticRegression(_) => "LogisticRegression",
            CandidateModel::RandomForest(_) => "RandomForest",
            CandidateModel::GaussianNb(_) => "GaussianNB",
        }
    }

    pub fn importance_strategy(&self) -> ImportanceStrategy {
        match self {
            CandidateModel::LogisticRegression(_) => ImportanceStrategy::LinearCoefficients,
            CandidateModel::RandomForest(_) => ImportanceStrategy::TreeImpurity,
            CandidateModel::GaussianNb(_) => ImportanceStrategy::Uniform,
        }
    }

    pub fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel, FitError> {
        Ok(match self {
            CandidateModel::LogisticRegression(params) => {
                FittedModel::LogisticRegression(params.fit(x, y, n_classes)?)
            }
            CandidateModel::RandomForest(params) => FittedModel::RandomForest(params.fit(x, y, n_classes)?),
            CandidateModel::GaussianNb(params) => FittedModel::GaussianNb(params.fit(x, y, n_classes)?),
        })
    }
}

/// Fitted estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    LogisticRegression(FittedLogistic),
    RandomForest(FittedForest),
    GaussianNb(FittedGaussianNb),
}

impl FittedModel {
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::LogisticRegression(m) => m.n_features(),
            FittedModel::RandomForest(m) => m.n_features(),
            FittedModel::GaussianNb(m) => m.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            FittedModel::LogisticRegression(m) => m.n_classes(),
            FittedModel::RandomForest(m) => m.n_classes(),
            FittedModel::GaussianNb(m) => m.n_classes(),
        }
    }

    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        match self {
            FittedModel::LogisticRegression(m) => m.predict_proba(features),
            FittedModel::RandomForest(m) => m.predict_proba(features),
            FittedModel::GaussianNb(m) => m.predict_proba(features),
        }
    }

    pub fn importance_strategy(&self) -> ImportanceStrategy {
        match self {
            FittedModel::LogisticRegression(_) => ImportanceStrategy::LinearCoefficients,
            FittedModel::RandomForest(_) => ImportanceStrategy::TreeImpurity,
            FittedModel::GaussianNb(_) => ImportanceStrategy::Uniform,
        }
    }

    /// Raw per-feature importances under this model's strategy
    pub fn feature_importances(&self) -> Vec<f64> {
        match self {
            FittedModel::RandomForest(m) => m.impurity_importances().to_vec(),
            FittedModel::LogisticRegression(m) => m.coefficient_importances(),
            FittedModel::GaussianNb(m) => {
                let n = m.n_features();
                vec![1.0 / n.max(1) as f64; n]
            }
        }
    }
}

/// Preprocessing plus estimator, usable as the bundle's classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    transformer: ColumnTransformer,
    model: FittedModel,
    labels: Vec<ClassLabel>,
}

impl FittedPipeline {
    pub fn new(
        transformer: ColumnTransformer,
        model: FittedModel,
        labels: Vec<ClassLabel>,
    ) -> Result<Self, FitError> {
        if transformer.n_features() != model.n_features() {
            return Err(FitError::FeatureMismatch {
                expected: model.n_features(),
                actual: transformer.n_features(),
            });
        }
        if labels.len() != model.n_classes() {
            return Err(FitError::LabelMismatch {
                labels: labels.len(),
                classes: model.n_classes(),
            });
        }
        Ok(Self { transformer, model, labels })
    }

    pub fn transformer(&self) -> &ColumnTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }
}

impl Classifier for FittedPipeline {
    fn classes(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        let features = self.transformer.transform_row(row)?;
        if features.len() != self.model.n_features() {
            return Err(InferenceError::new(format!(
                "model expects {} features, transformer produced {}",
                self.model.n_features(),
                features.len()
            )));
        }
        Ok(self.model.predict_proba(&features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeatureSchema, FeatureValue};
    use crate::ml::LabelEncoder;

    fn training_rows() -> (Vec<String>, Vec<FeatureRow>, Vec<usize>) {
        let columns = vec!["gender".to_string(), "symptom_fever".to_string()];
        let schema: FeatureSchema = columns.clone().into();
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let fever = (i % 2) as f64;
            let gender = if i % 3 == 0 { "male" } else { "female" };
            rows.push(
                FeatureRow::new(
                    schema.clone(),
                    vec![FeatureValue::Category(gender.to_string()), FeatureValue::Number(fever)],
                )
                .unwrap(),
            );
            y.push(i % 2);
        }
        (columns, rows, y)
    }

    #[test]
    fn test_every_candidate_fits_and_predicts() {
        let (columns, rows, y) = training_rows();
        let transformer = ColumnTransformer::fit(&columns, &rows).unwrap();
        let x = transformer.transform(&rows).unwrap();
        let encoder = LabelEncoder::fit(["Cold", "Flu"]);

        for candidate in CandidateModel::default_candidates() {
            let model = candidate.fit(&x, &y, 2).unwrap();
            assert_eq!(model.importance_strategy(), candidate.importance_strategy());
            assert_eq!(model.feature_importances().len(), 3);

            let pipeline = FittedPipeline::new(transformer.clone(), model, encoder.encoded_labels()).unwrap();
            let p = pipeline.predict_proba(&rows[1]).unwrap();
            assert_eq!(p.len(), 2);
            assert!(p[1] > 0.5, "{} failed: {:?}", candidate.name(), p);
        }
    }

    #[test]
    fn test_pipeline_serde_keeps_predictions() {
        let (columns, rows, y) = training_rows();
        let transformer = ColumnTransformer::fit(&columns, &rows).unwrap();
        let x = transformer.transform(&rows).unwrap();
        let model = CandidateModel::LogisticRegression(LogisticRegression::default())
            .fit(&x, &y, 2)
            .unwrap();
        let pipeline = FittedPipeline::new(transformer, model, vec![ClassLabel::Encoded(0), ClassLabel::Encoded(1)]).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: FittedPipeline = serde_json::from_str(&json).unwrap();
        let before = pipeline.predict_proba(&rows[0]).unwrap();
        let after = restored.predict_proba(&rows[0]).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_candidate_names_and_tags() {
        let names: Vec<&str> = CandidateModel::default_candidates().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["LogisticRegression", "RandomForest", "GaussianNB"]);

        let json = serde_json::to_value(CandidateModel::GaussianNb(GaussianNb::default())).unwrap();
        assert_eq!(json["kind"], "gaussian_nb");
    }

    #[test]
    fn test_mismatched_labels_rejected() {
        let (columns, rows, y) = training_rows();
        let transformer = ColumnTransformer::fit(&columns, &rows).unwrap();
        let x = transformer.transform(&rows).unwrap();
        let model = GaussianNb::default().fit(&x, &y, 2).unwrap();
        let result = FittedPipeline::new(transformer, FittedModel::GaussianNb(model), vec![ClassLabel::Encoded(0)]);
        assert!(result.is_err());
    }
}
