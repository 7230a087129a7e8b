//! Column transformer turning fixed-schema rows into dense model input.
//!
//! Categorical columns are one-hot encoded over the categories seen during
//! fitting, numeric columns are standardized. Output layout is every one-hot
//! block first, then the numeric columns in schema order.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::core::{features::one_hot_column, FeatureRow, FeatureValue, InferenceError};
use crate::ml::FitError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalColumn {
    column: String,
    categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericColumn {
    column: String,
    mean: f64,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    input_columns: Vec<String>,
    categorical: Vec<CategoricalColumn>,
    numeric: Vec<NumericColumn>,
}

impl ColumnTransformer {
    /// Learn categories and scaling from training rows
    ///
    /// A column is categorical when any row holds a category in it. Mixing a
    /// category with a non-zero number in the same column is rejected.
    pub fn fit(columns: &[String], rows: &[FeatureRow]) -> Result<Self, FitError> {
        if rows.is_empty() || columns.is_empty() {
            return Err(FitError::EmptyInput);
        }

        let mut categorical = Vec::new();
        let mut numeric = Vec::new();

        for (pos, column) in columns.iter().enumerate() {
            let values: Vec<&FeatureValue> = rows
                .iter()
                .map(|row| row.values().get(pos).ok_or(FitError::EmptyInput))
                .collect::<Result<_, _>>()?;

            if values.iter().any(|v| v.as_category().is_some()) {
                let mut categories = BTreeSet::new();
                for value in &values {
                    match value {
                        FeatureValue::Category(c) => {
                            categories.insert(c.clone());
                        }
                        FeatureValue::Number(n) if *n == 0.0 => {}
                        FeatureValue::Number(_) => return Err(FitError::MixedColumn(column.clone())),
                    }
                }
                categorical.push(CategoricalColumn {
                    column: column.clone(),
                    categories: categories.into_iter().collect(),
                });
            } else {
                let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
                if numbers.iter().any(|v| !v.is_finite()) {
                    return Err(FitError::NonFinite);
                }
                let n = numbers.len() as f64;
                let mean = numbers.iter().sum::<f64>() / n;
                let variance = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                numeric.push(NumericColumn {
                    column: column.clone(),
                    mean,
                    scale: if std > 0.0 { std } else { 1.0 },
                });
            }
        }

        Ok(Self {
            input_columns: columns.to_vec(),
            categorical,
            numeric,
        })
    }

    pub fn input_columns(&self) -> &[String] {
        &self.input_columns
    }

    /// Output column names, in the order `transform_row` emits values
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_features());
        for cat in &self.categorical {
            for category in &cat.categories {
                names.push(one_hot_column(&cat.column, category));
            }
        }
        names.extend(self.numeric.iter().map(|n| n.column.clone()));
        names
    }

    pub fn n_features(&self) -> usize {
        self.categorical.iter().map(|c| c.categories.len()).sum::<usize>() + self.numeric.len()
    }

    /// Encode one row; columns are looked up by name
    pub fn transform_row(&self, row: &FeatureRow) -> Result<Vec<f64>, InferenceError> {
        let mut out = Vec::with_capacity(self.n_features());

        for cat in &self.categorical {
            let value = row
                .get(&cat.column)
                .ok_or_else(|| InferenceError::new(format!("row is missing column '{}'", cat.column)))?;
            let category = value.as_category();
            for known in &cat.categories {
                out.push(if category == Some(known.as_str()) { 1.0 } else { 0.0 });
            }
        }

        for num in &self.numeric {
            let value = row
                .get(&num.column)
                .ok_or_else(|| InferenceError::new(format!("row is missing column '{}'", num.column)))?;
            let number = value.as_number().ok_or_else(|| {
                InferenceError::new(format!("column '{}' expects a number, got '{}'", num.column, value))
            })?;
            out.push((number - num.mean) / num.scale);
        }

        Ok(out)
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Result<Array2<f64>, InferenceError> {
        let width = self.n_features();
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            data.extend(self.transform_row(row)?);
        }
        Array2::from_shape_vec((rows.len(), width), data)
            .map_err(|e| InferenceError::new(e.to_string()))
    }
}
