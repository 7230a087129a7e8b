use linfa::traits::Fit;
use linfa_bayes::{GaussianNb as GaussianModel, NaiveBayes};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::ml::{check_training_input, single_row, training_set, FitError};

/// Gaussian naive Bayes hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    /// Fraction of the largest feature variance added to every variance
    pub var_smoothing: f64,
}

impl Default for GaussianNb {
    fn default() -> Self {
        Self { var_smoothing: 1e-9 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedGaussianNb {
    model: GaussianModel<f64, usize>,
    n_features: usize,
    n_classes: usize,
}

impl GaussianNb {
    pub fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedGaussianNb, FitError> {
        check_training_input(x, y, n_classes)?;

        let model = GaussianModel::params()
            .var_smoothing(self.var_smoothing)
            .fit(&training_set(x, y))
            .map_err(|e| FitError::Estimator {
                model: "GaussianNB",
                message: e.to_string(),
            })?;

        Ok(FittedGaussianNb {
            model,
            n_features: x.ncols(),
            n_classes,
        })
    }
}

impl FittedGaussianNb {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let row = single_row(features);
        let (probabilities, classes) = self.model.predict_proba(row.view());

        // Columns come back in the model's own class order
        let mut out = vec![0.0; self.n_classes];
        for (column, class) in classes.iter().enumerate() {
            if let Some(slot) = out.get_mut(**class) {
                *slot = probabilities[[0, column]];
            }
        }
        out
    }
}
