use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::core::features::{
    symptom_from_column, AGE_COLUMN, ALCOHOL_COLUMN, DURATION_COLUMN, SMOKING_COLUMN,
};
use crate::training::dataset::{encode_one_hot, Dataset};

/// Encoded features kept no matter how they rank
pub const PROTECTED_FEATURES: [&str; 6] = [
    AGE_COLUMN,
    DURATION_COLUMN,
    SMOKING_COLUMN,
    ALCOHOL_COLUMN,
    "gender_female",
    "gender_male",
];

/// Columns with more distinct values than this are binned
const MAX_DISCRETE_VALUES: usize = 10;
const N_BINS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub mutual_information: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelection {
    /// Every encoded feature, highest score first
    pub ranking: Vec<FeatureScore>,
    pub selected: Vec<String>,
}

/// Written next to the cleaned dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionMetadata {
    pub selected_encoded_features: Vec<String>,
    pub num_rows: usize,
    /// Includes the target column
    pub num_columns: usize,
}

impl SelectionMetadata {
    pub fn new(selection: &FeatureSelection, dataset: &Dataset) -> Self {
        Self {
            selected_encoded_features: selection.selected.clone(),
            num_rows: dataset.len(),
            num_columns: dataset.columns().len() + 1,
        }
    }
}

/// Map raw values to small integer codes
fn discretize(values: &[f64]) -> Vec<usize> {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    if distinct.len() <= MAX_DISCRETE_VALUES {
        return values
            .iter()
            .map(|v| distinct.iter().position(|d| d == v).unwrap_or(0))
            .collect();
    }

    let min = distinct[0];
    let max = distinct[distinct.len() - 1];
    let width = (max - min) / N_BINS as f64;
    values
        .iter()
        .map(|v| {
            if width <= 0.0 {
                0
            } else {
                (((v - min) / width) as usize).min(N_BINS - 1)
            }
        })
        .collect()
}

/// Mutual information in nats between two discrete variables
pub fn mutual_information(feature: &[usize], target: &[usize]) -> f64 {
    let n = feature.len().min(target.len());
    if n == 0 {
        return 0.0;
    }

    let mut joint: HashMap<(usize, usize), f64> = HashMap::new();
    let mut px: HashMap<usize, f64> = HashMap::new();
    let mut py: HashMap<usize, f64> = HashMap::new();
    for (&x, &y) in feature.iter().zip(target).take(n) {
        *joint.entry((x, y)).or_default() += 1.0;
        *px.entry(x).or_default() += 1.0;
        *py.entry(y).or_default() += 1.0;
    }

    let n = n as f64;
    joint
        .iter()
        .map(|(&(x, y), &count)| {
            let pxy = count / n;
            pxy * (pxy / ((px[&x] / n) * (py[&y] / n))).ln()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Rank encoded features by mutual information with the disease label
///
/// The selection is the top `top_k`, then any protected feature, then any
/// symptom column ranked inside the top `top_k + 5`.
pub fn select_features(dataset: &Dataset, top_k: usize) -> FeatureSelection {
    let classes = dataset.classes();
    let target: Vec<usize> = dataset
        .targets()
        .iter()
        .map(|t| classes.binary_search(t).unwrap_or(0))
        .collect();

    let (names, columns) = encode_one_hot(dataset);
    let mut ranking: Vec<FeatureScore> = names
        .iter()
        .zip(&columns)
        .map(|(name, values)| FeatureScore {
            feature: name.clone(),
            mutual_information: mutual_information(&discretize(values), &target),
        })
        .collect();
    ranking.sort_by(|a, b| b.mutual_information.total_cmp(&a.mutual_information));

    let mut selected: Vec<String> = ranking.iter().take(top_k).map(|s| s.feature.clone()).collect();
    for protected in PROTECTED_FEATURES {
        if names.iter().any(|n| n == protected) && !selected.iter().any(|s| s == protected) {
            selected.push(protected.to_string());
        }
    }
    for score in ranking.iter().take(top_k + 5) {
        if symptom_from_column(&score.feature).is_some() && !selected.contains(&score.feature) {
            selected.push(score.feature.clone());
        }
    }

    tracing::debug!(
        "Selected {} of {} encoded features",
        selected.len(),
        ranking.len()
    );
    FeatureSelection { ranking, selected }
}
