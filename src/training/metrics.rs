use serde::{Deserialize, Serialize};
use crate::models::ModelMetrics;

/// Round to the 4 decimals used in reports
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Precision, recall and F1 for one class, or their support-weighted average
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ClassScores {
    fn rounded(self) -> Self {
        Self {
            precision: round4(self.precision),
            recall: round4(self.recall),
            f1_score: round4(self.f1_score),
            support: self.support,
        }
    }
}

/// `matrix[true][predicted]`
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassScores>,
    pub weighted: ClassScores,
    pub accuracy: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
}

impl ClassificationReport {
    /// Score predictions; undefined ratios count as zero
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let matrix = confusion_matrix(y_true, y_pred, n_classes);
        let total: usize = matrix.iter().flatten().sum();
        let correct: usize = (0..n_classes).map(|c| matrix[c][c]).sum();

        let per_class: Vec<ClassScores> = (0..n_classes)
            .map(|c| {
                let tp = matrix[c][c];
                let support: usize = matrix[c].iter().sum();
                let predicted: usize = matrix.iter().map(|row| row[c]).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassScores {
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let mut weighted = ClassScores { support: total, ..Default::default() };
        if total > 0 {
            for scores in &per_class {
                let w = scores.support as f64 / total as f64;
                weighted.precision += w * scores.precision;
                weighted.recall += w * scores.recall;
                weighted.f1_score += w * scores.f1_score;
            }
        }

        Self {
            per_class,
            weighted,
            accuracy: ratio(correct, total),
            confusion_matrix: matrix,
        }
    }

    /// Summary with every score rounded for reporting
    pub fn model_metrics(&self) -> ModelMetrics {
        ModelMetrics {
            accuracy: round4(self.accuracy),
            precision: round4(self.weighted.precision),
            recall: round4(self.weighted.recall),
            f1_score: round4(self.weighted.f1_score),
        }
    }

    pub fn rounded_per_class(&self) -> Vec<ClassScores> {
        self.per_class.iter().map(|s| s.rounded()).collect()
    }

    pub fn rounded_weighted(&self) -> ClassScores {
        self.weighted.rounded()
    }
}
