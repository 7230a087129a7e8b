//! Random forest of linfa Gini decision trees.
//!
//! Each tree is fit on a bootstrap sample over a random subspace of the
//! features, from its own RNG seeded with `seed + tree_index`, so a forest is
//! reproducible regardless of how rayon schedules the work.

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::ml::{check_training_input, single_row, FitError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features drawn per tree; `None` takes half, rounded up
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// A tree together with the global indexes of the columns it was fit on
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubspaceTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedForest {
    trees: Vec<SubspaceTree>,
    n_classes: usize,
    n_features: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    fn subspace_size(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or((n_features + 1) / 2)
            .clamp(1, n_features)
    }

    fn fit_tree(&self, x: &Array2<f64>, y: &[usize], index: usize) -> Result<SubspaceTree, FitError> {
        let (n_rows, n_features) = x.dim();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));

        let mut features = sample(&mut rng, n_features, self.subspace_size(n_features)).into_vec();
        features.sort_unstable();
        let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

        let records = x.select(Axis(0), &rows).select(Axis(1), &features);
        let targets: Array1<usize> = rows.iter().map(|&r| y[r]).collect();

        let tree = DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(self.max_depth)
            .min_weight_split(self.min_samples_split.max(1) as f32)
            .fit(&Dataset::new(records, targets))
            .map_err(|e| FitError::Estimator {
                model: "RandomForest",
                message: e.to_string(),
            })?;

        Ok(SubspaceTree { features, tree })
    }

    pub fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedForest, FitError> {
        check_training_input(x, y, n_classes)?;

        let n_features = x.ncols();
        let trees: Vec<SubspaceTree> = (0..self.n_trees.max(1))
            .into_par_iter()
            .map(|i| self.fit_tree(x, y, i))
            .collect::<Result<_, _>>()?;

        // Per-tree importances are normalized before averaging
        let mut importances = vec![0.0; n_features];
        for fitted in &trees {
            let local = fitted.tree.feature_importance();
            let sum: f64 = local.iter().sum();
            if sum > 0.0 {
                for (&feature, value) in fitted.features.iter().zip(&local) {
                    importances[feature] += value / sum;
                }
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|v| *v /= sum);
        }

        tracing::debug!(
            "Fitted random forest: {} trees, {} features per tree",
            trees.len(),
            self.subspace_size(n_features)
        );
        Ok(FittedForest {
            trees,
            n_classes,
            n_features,
            importances,
        })
    }
}

impl FittedForest {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Fraction of trees voting for each class
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let row = single_row(features);
        let mut votes = vec![0.0; self.n_classes];
        for fitted in &self.trees {
            let records = row.select(Axis(1), &fitted.features);
            let predicted: Array1<usize> = fitted.tree.predict(&records);
            if let Some(vote) = predicted.get(0).and_then(|&class| votes.get_mut(class)) {
                *vote += 1.0;
            }
        }
        let n = self.trees.len().max(1) as f64;
        votes.iter_mut().for_each(|v| *v /= n);
        votes
    }

    /// Mean decrease in Gini impurity, summing to one
    pub fn impurity_importances(&self) -> &[f64] {
        &self.importances
    }
}
