use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use crate::models::{Gender, ModelBundle, PredictRequest};

pub const AGE_COLUMN: &str = "age";
pub const GENDER_COLUMN: &str = "gender";
pub const DURATION_COLUMN: &str = "symptom_duration";
pub const SMOKING_COLUMN: &str = "smoking";
pub const ALCOHOL_COLUMN: &str = "alcohol";
pub const SYMPTOM_PREFIX: &str = "symptom_";

/// Ordered column names shared by every row built against the same schema
pub type FeatureSchema = Arc<[String]>;

/// A single cell of a feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn flag(value: bool) -> Self {
        FeatureValue::Number(if value { 1.0 } else { 0.0 })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(v) => Some(v),
            FeatureValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Category(v) => f.write_str(v),
        }
    }
}

/// Fixed-schema record consumed by a classifier
///
/// Values are stored positionally; the schema is the single source of truth
/// for column names and order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    schema: FeatureSchema,
    values: Vec<FeatureValue>,
}

impl FeatureRow {
    /// Wrap positional values; `None` if the lengths disagree
    pub fn new(schema: FeatureSchema, values: Vec<FeatureValue>) -> Option<Self> {
        (schema.len() == values.len()).then_some(Self { schema, values })
    }

    /// Lay staged `(column, value)` pairs onto `schema`
    ///
    /// Columns the schema names but `staged` does not are zero-filled. Staged
    /// columns the schema does not name are dropped.
    pub fn reindex<I, K>(schema: FeatureSchema, staged: I) -> Self
    where
        I: IntoIterator<Item = (K, FeatureValue)>,
        K: AsRef<str>,
    {
        let mut values = vec![FeatureValue::Number(0.0); schema.len()];
        for (column, value) in staged {
            if let Some(pos) = schema.iter().position(|c| c == column.as_ref()) {
                values[pos] = value;
            }
        }
        Self { schema, values }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        &self.schema
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.schema
            .iter()
            .position(|c| c == column)
            .map(|pos| &self.values[pos])
    }

    /// Replace the value of an existing column; returns false if the schema lacks it
    pub fn set(&mut self, column: &str, value: FeatureValue) -> bool {
        match self.schema.iter().position(|c| c == column) {
            Some(pos) => {
                self.values[pos] = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.schema.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn symptom_column(symptom: &str) -> String {
    format!("{}{}", SYMPTOM_PREFIX, symptom)
}

/// Symptom named by a `symptom_<name>` column
///
/// Returns `None` for non-symptom columns and for the duration column, which
/// shares the prefix but is not a symptom.
pub fn symptom_from_column(column: &str) -> Option<&str> {
    if column == DURATION_COLUMN {
        return None;
    }
    column.strip_prefix(SYMPTOM_PREFIX).filter(|s| !s.is_empty())
}

pub fn one_hot_column(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Build the feature row the bundle's classifier expects
///
/// `symptoms` must already be normalized. Every known symptom of the bundle
/// gets an explicit 0/1 column, gender is emitted both as a categorical value
/// and as one-hot columns, and the final reindex onto the bundle's feature
/// columns decides which of those survive and in what order.
pub fn build_feature_row(
    request: &PredictRequest,
    symptoms: &[String],
    bundle: &ModelBundle,
) -> FeatureRow {
    let lifestyle = request.lifestyle();
    let vocabulary = bundle.vocabulary();

    let mut staged: Vec<(String, FeatureValue)> = Vec::with_capacity(vocabulary.len() + 7);
    staged.push((AGE_COLUMN.to_string(), FeatureValue::Number(f64::from(request.age))));
    staged.push((
        DURATION_COLUMN.to_string(),
        FeatureValue::Number(f64::from(request.duration_days)),
    ));
    staged.push((SMOKING_COLUMN.to_string(), FeatureValue::flag(lifestyle.smoking)));
    staged.push((ALCOHOL_COLUMN.to_string(), FeatureValue::flag(lifestyle.alcohol)));

    staged.push((
        GENDER_COLUMN.to_string(),
        FeatureValue::Category(request.gender.as_str().to_string()),
    ));
    for gender in [Gender::Female, Gender::Male] {
        staged.push((
            one_hot_column(GENDER_COLUMN, gender.as_str()),
            FeatureValue::flag(gender == request.gender),
        ));
    }

    for symptom in vocabulary.iter() {
        let present = symptoms.iter().any(|s| s == symptom);
        staged.push((symptom_column(symptom), FeatureValue::flag(present)));
    }

    FeatureRow::reindex(Arc::clone(bundle.feature_columns()), staged)
}
