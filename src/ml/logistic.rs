use linfa::traits::Fit;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use crate::ml::{check_training_input, single_row, training_set, FitError};

/// Multinomial logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub max_iter: u64,
    /// L2 penalty strength
    pub alpha: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            max_iter: 200,
            alpha: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedLogistic {
    model: MultiFittedLogisticRegression<f64, usize>,
    n_features: usize,
    n_classes: usize,
}

impl LogisticRegression {
    pub fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedLogistic, FitError> {
        check_training_input(x, y, n_classes)?;

        let model = MultiLogisticRegression::<f64>::default()
            .max_iterations(self.max_iter)
            .alpha(self.alpha)
            .fit(&training_set(x, y))
            .map_err(|e| FitError::Estimator {
                model: "LogisticRegression",
                message: e.to_string(),
            })?;

        tracing::debug!(
            "Fitted logistic regression: {} classes, {} features",
            n_classes,
            x.ncols()
        );
        Ok(FittedLogistic {
            model,
            n_features: x.ncols(),
            n_classes,
        })
    }
}

impl FittedLogistic {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Class probabilities; every class was present at fit time, so columns
    /// follow the encoded class order
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let probabilities = self.model.predict_probabilities(&single_row(features));
        probabilities.row(0).to_vec()
    }

    /// Mean absolute coefficient of each feature across classes
    pub fn coefficient_importances(&self) -> Vec<f64> {
        // `params` is `n_features x n_classes`
        self.model
            .params()
            .mapv(f64::abs)
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }
}
