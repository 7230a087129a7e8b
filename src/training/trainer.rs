//! Candidate training and model selection.
//!
//! Every candidate is fitted on the same stratified split and scored on the
//! held-out rows. The highest weighted F1 wins; a tie keeps the earlier
//! candidate. The winner's native importances are normalized and folded onto
//! base symptoms to produce the bundle's global explanation scores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use crate::core::features::symptom_from_column;
use crate::core::InferenceError;
use crate::ml::{
    argmax, CandidateModel, ColumnTransformer, FitError, FittedModel, FittedPipeline, LabelEncoder,
};
use crate::models::{BundleArtifact, ModelMetrics, SchemaError};
use crate::training::dataset::{stratified_split, Dataset, DatasetError};
use crate::training::metrics::ClassificationReport;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training dataset is empty")]
    EmptyDataset,

    #[error("class '{0}' has no rows in the training split")]
    MissingClass(String),

    #[error("no candidate models configured")]
    NoCandidates,

    #[error("{name}: {source}")]
    Fit {
        name: &'static str,
        #[source]
        source: FitError,
    },

    #[error(transparent)]
    Preprocess(#[from] FitError),

    #[error(transparent)]
    Transform(#[from] InferenceError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub candidates: Vec<CandidateModel>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            candidates: CandidateModel::default_candidates(),
        }
    }
}

/// Metrics report written next to the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_model: String,
    pub results: BTreeMap<String, ModelMetrics>,
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub artifact: BundleArtifact,
    pub report: TrainingReport,
}

/// Normalize raw importances to sum to one
pub fn normalize_importances(raw: &[f64]) -> Vec<f64> {
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|v| v / (sum + 1e-9)).collect()
}

/// Fold transformed-column importances onto base symptoms
///
/// Columns named `symptom_<name>` (or a derived `symptom_<name>_<suffix>`)
/// count toward the longest known symptom they start with. Every known
/// symptom gets an entry, zero when no column maps to it.
pub fn aggregate_symptom_importance(
    feature_names: &[String],
    importances: &[f64],
    known_symptoms: &[String],
) -> BTreeMap<String, f64> {
    let mut aggregated: BTreeMap<String, f64> =
        known_symptoms.iter().map(|s| (s.clone(), 0.0)).collect();

    for (name, score) in feature_names.iter().zip(importances) {
        let Some(base) = symptom_from_column(name) else {
            continue;
        };
        let matched = known_symptoms
            .iter()
            .filter(|known| {
                base == known.as_str()
                    || base
                        .strip_prefix(known.as_str())
                        .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|known| known.len());
        if let Some(known) = matched {
            if let Some(total) = aggregated.get_mut(known) {
                *total += score;
            }
        }
    }
    aggregated
}

/// Train every candidate and assemble the bundle artifact for the winner
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingOutcome, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if config.candidates.is_empty() {
        return Err(TrainingError::NoCandidates);
    }

    let encoder = LabelEncoder::fit(dataset.targets());
    let y: Vec<usize> = dataset
        .targets()
        .iter()
        .map(|t| encoder.encode(t).unwrap_or(0))
        .collect();

    let (train_idx, test_idx) = stratified_split(dataset.targets(), config.test_fraction, config.seed);
    let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();
    for (code, class) in encoder.classes().iter().enumerate() {
        if !y_train.contains(&code) {
            return Err(TrainingError::MissingClass(class.clone()));
        }
    }

    let train_rows = dataset.subset(&train_idx).feature_rows();
    let test_rows = dataset.subset(&test_idx).feature_rows();
    let transformer = ColumnTransformer::fit(dataset.columns(), &train_rows)?;
    let x_train = transformer.transform(&train_rows)?;
    let x_test = transformer.transform(&test_rows)?;

    tracing::info!(
        "Training {} candidates on {} rows ({} held out), {} classes, {} features",
        config.candidates.len(),
        train_idx.len(),
        test_idx.len(),
        encoder.len(),
        transformer.n_features()
    );

    let mut results = BTreeMap::new();
    let mut fitted: Vec<(&CandidateModel, FittedModel)> = Vec::with_capacity(config.candidates.len());
    let mut f1_scores = Vec::with_capacity(config.candidates.len());

    for candidate in &config.candidates {
        let started = Instant::now();
        let model = candidate
            .fit(&x_train, &y_train, encoder.len())
            .map_err(|source| TrainingError::Fit { name: candidate.name(), source })?;

        let y_pred: Vec<usize> = x_test
            .rows()
            .into_iter()
            .map(|row| argmax(&model.predict_proba(&row.to_vec())))
            .collect();
        let report = ClassificationReport::from_predictions(&y_test, &y_pred, encoder.len());
        let metrics = report.model_metrics();

        tracing::info!(
            "{}: accuracy={:.4} f1={:.4} ({}ms)",
            candidate.name(),
            metrics.accuracy,
            metrics.f1_score,
            started.elapsed().as_millis()
        );
        results.insert(candidate.name().to_string(), metrics);
        f1_scores.push(report.weighted.f1_score);
        fitted.push((candidate, model));
    }

    let best = select_best(&f1_scores).ok_or(TrainingError::NoCandidates)?;
    let (winner, model) = fitted.swap_remove(best);
    let strategy = model.importance_strategy();
    let importances = normalize_importances(&model.feature_importances());
    let known_symptoms = dataset.symptoms();
    let symptom_importance =
        aggregate_symptom_importance(&transformer.feature_names(), &importances, &known_symptoms);

    tracing::info!("Best model: {} (importance: {})", winner.name(), strategy);

    let classifier = FittedPipeline::new(transformer, model, encoder.encoded_labels())?;
    let artifact = BundleArtifact {
        classifier: Some(classifier),
        best_model_name: Some(winner.name().to_string()),
        known_symptoms: Some(known_symptoms),
        feature_columns: Some(dataset.columns().to_vec()),
        classes: Some(encoder.classes().to_vec()),
        symptom_importance: Some(symptom_importance),
        label_encoder: Some(encoder),
        importance_strategy: Some(strategy),
        metrics: results.clone(),
    };

    Ok(TrainingOutcome {
        artifact,
        report: TrainingReport {
            best_model: winner.name().to_string(),
            results,
        },
    })
}

/// Index of the highest weighted F1; the earliest candidate wins a tie
pub fn select_best(f1_scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &f1) in f1_scores.iter().enumerate() {
        if best.map_or(true, |b| f1 > f1_scores[b]) {
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{GaussianNb, LogisticRegression, RandomForest};
    use crate::training::dataset::{default_profiles, generate_synthetic, SyntheticConfig};

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aggregate_sums_variants_and_skips_duration() {
        let names = owned(&[
            "gender_male",
            "symptom_fever",
            "symptom_sore_throat",
            "symptom_sore_throat_1",
            "symptom_duration",
            "age",
        ]);
        let scores = [0.1, 0.2, 0.15, 0.05, 0.4, 0.1];
        let known = owned(&["fever", "sore", "sore_throat", "cough"]);
        let aggregated = aggregate_symptom_importance(&names, &scores, &known);

        assert!((aggregated["sore_throat"] - 0.2).abs() < 1e-12);
        assert_eq!(aggregated["fever"], 0.2);
        assert_eq!(aggregated["sore"], 0.0);
        assert_eq!(aggregated["cough"], 0.0);
        assert!(!aggregated.contains_key("duration"));
    }

    #[test]
    fn test_select_best_keeps_first_on_tie() {
        assert_eq!(select_best(&[0.9, 0.9]), Some(0));
        assert_eq!(select_best(&[0.8, 0.9, 0.9]), Some(1));
        assert_eq!(select_best(&[0.5, 0.7, 0.6]), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_normalize_importances() {
        let normalized = normalize_importances(&[1.0, 3.0]);
        assert!((normalized[0] - 0.25).abs() < 1e-6);
        assert!(normalize_importances(&[0.0, 0.0]).iter().all(|v| *v == 0.0));
    }

    fn small_dataset() -> Dataset {
        let config = SyntheticConfig { num_samples: 400, ..Default::default() };
        generate_synthetic(&config, &default_profiles())
            .unwrap()
            .clean()
            .unwrap()
    }

    fn fast_config() -> TrainingConfig {
        TrainingConfig {
            candidates: vec![
                CandidateModel::LogisticRegression(LogisticRegression { max_iter: 100, ..Default::default() }),
                CandidateModel::RandomForest(RandomForest { n_trees: 10, ..Default::default() }),
                CandidateModel::GaussianNb(GaussianNb::default()),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_train_produces_valid_bundle() {
        let dataset = small_dataset();
        let outcome = train(&dataset, &fast_config()).unwrap();

        assert_eq!(outcome.report.results.len(), 3);
        let best = &outcome.report.results[&outcome.report.best_model];
        assert!(outcome.report.results.values().all(|m| m.f1_score <= best.f1_score));

        let bundle = outcome.artifact.into_bundle().unwrap();
        assert_eq!(bundle.classes().len(), 8);
        assert_eq!(bundle.vocabulary().len(), 14);
        let total: f64 = bundle.symptom_importance().ranking().iter().map(|(_, v)| v).sum();
        assert!(total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_naive_bayes_uses_uniform_importance() {
        let dataset = small_dataset();
        let config = TrainingConfig {
            candidates: vec![CandidateModel::GaussianNb(GaussianNb::default())],
            ..Default::default()
        };
        let outcome = train(&dataset, &config).unwrap();
        assert_eq!(outcome.report.best_model, "GaussianNB");
        assert_eq!(outcome.report.results.len(), 1);
        assert_eq!(outcome.artifact.importance_strategy, Some(crate::ml::ImportanceStrategy::Uniform));

        // Uniform importance spreads evenly over the symptom columns
        let importance = outcome.artifact.symptom_importance.unwrap();
        let first = importance["fever"];
        assert!(importance.values().all(|v| (v - first).abs() < 1e-12));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let dataset = small_dataset();
        let empty = dataset.subset(&[]);
        assert!(matches!(train(&empty, &fast_config()), Err(TrainingError::EmptyDataset)));

        let config = TrainingConfig { candidates: Vec::new(), ..Default::default() };
        assert!(matches!(train(&dataset, &config), Err(TrainingError::NoCandidates)));
    }
}
