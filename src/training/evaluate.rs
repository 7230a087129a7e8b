use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use crate::core::{decode_label, FeatureRow};
use crate::ml::argmax;
use crate::models::ModelBundle;
use crate::training::dataset::{stratified_split, Dataset};
use crate::training::metrics::{round4, ClassScores, ClassificationReport};
use crate::training::trainer::TrainingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub best_model: String,
    pub accuracy: f64,
    pub weighted_avg: ClassScores,
    pub per_class: BTreeMap<String, ClassScores>,
    /// Rows are true labels, columns predicted labels, both in `labels` order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub labels: Vec<String>,
}

/// Score a bundle on the held-out split of `dataset`
///
/// The split is recreated from `test_fraction` and `seed`, so evaluating
/// with the training settings scores exactly the rows training held out.
/// Rows go through the bundle's classifier as-is, reindexed onto its
/// feature columns.
pub fn evaluate(
    bundle: &ModelBundle,
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<EvaluationReport, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let (_, test_idx) = stratified_split(dataset.targets(), test_fraction, seed);
    let test = dataset.subset(&test_idx);

    let mut predicted = Vec::with_capacity(test.len());
    for row in test.feature_rows() {
        let row = FeatureRow::reindex(
            Arc::clone(bundle.feature_columns()),
            row.iter().map(|(column, value)| (column, value.clone())),
        );
        let probabilities = bundle.classifier().predict_proba(&row)?;
        let label = &bundle.classifier().classes()[argmax(&probabilities)];
        predicted.push(decode_label(label, bundle.label_encoder())?);
    }

    let labels: Vec<String> = dataset
        .targets()
        .iter()
        .chain(predicted.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index = |label: &String| labels.binary_search(label).unwrap_or(0);
    let y_true: Vec<usize> = test.targets().iter().map(index).collect();
    let y_pred: Vec<usize> = predicted.iter().map(index).collect();

    let report = ClassificationReport::from_predictions(&y_true, &y_pred, labels.len());
    tracing::info!(
        "Evaluated {} on {} held-out rows: accuracy={:.4}",
        bundle.best_model_name(),
        test.len(),
        report.accuracy
    );

    Ok(EvaluationReport {
        best_model: bundle.best_model_name().to_string(),
        accuracy: round4(report.accuracy),
        weighted_avg: report.rounded_weighted(),
        per_class: labels.iter().cloned().zip(report.rounded_per_class()).collect(),
        confusion_matrix: report.confusion_matrix,
        labels,
    })
}
