//! Tabular patient records: CSV I/O, cleaning, synthetic generation and
//! stratified splitting.

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use crate::core::features::{
    one_hot_column, symptom_column, symptom_from_column, AGE_COLUMN, ALCOHOL_COLUMN,
    DURATION_COLUMN, GENDER_COLUMN, SMOKING_COLUMN,
};
use crate::core::{FeatureRow, FeatureSchema, FeatureValue};

pub const TARGET_COLUMN: &str = "disease";

/// Columns read as categories rather than numbers
const CATEGORICAL_COLUMNS: [&str; 1] = [GENDER_COLUMN];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset has no '{0}' column")]
    MissingColumn(String),

    #[error("row {row} has {actual} values, expected {expected}")]
    RowLength { row: usize, expected: usize, actual: usize },

    #[error("invalid sampling distribution: {0}")]
    Distribution(String),

    #[error("dataset has no rows")]
    Empty,
}

/// Feature columns plus one disease label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: FeatureSchema,
    rows: Vec<Vec<FeatureValue>>,
    targets: Vec<String>,
}

impl Dataset {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<FeatureValue>>,
        targets: Vec<String>,
    ) -> Result<Self, DatasetError> {
        if rows.len() != targets.len() {
            return Err(DatasetError::RowLength {
                row: rows.len().min(targets.len()),
                expected: rows.len(),
                actual: targets.len(),
            });
        }
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(DatasetError::RowLength {
                row,
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            schema: columns.into(),
            rows,
            targets,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.schema
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.schema.iter().position(|c| c == column)
    }

    /// Sorted distinct labels
    pub fn classes(&self) -> Vec<String> {
        self.targets
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Symptom names of the `symptom_<name>` columns, in column order
    pub fn symptoms(&self) -> Vec<String> {
        self.schema
            .iter()
            .filter_map(|c| symptom_from_column(c))
            .map(str::to_string)
            .collect()
    }

    pub fn row(&self, index: usize) -> Option<FeatureRow> {
        let values = self.rows.get(index)?.clone();
        FeatureRow::new(Arc::clone(&self.schema), values)
    }

    pub fn feature_rows(&self) -> Vec<FeatureRow> {
        self.rows
            .iter()
            .filter_map(|values| FeatureRow::new(Arc::clone(&self.schema), values.clone()))
            .collect()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            schema: Arc::clone(&self.schema),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
            targets: indices.iter().filter_map(|&i| self.targets.get(i).cloned()).collect(),
        }
    }

    fn numeric_column(&self, column: &str) -> Result<Vec<f64>, DatasetError> {
        let pos = self
            .column_index(column)
            .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;
        Ok(self
            .rows
            .iter()
            .map(|r| r[pos].as_number().unwrap_or(f64::NAN))
            .collect())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        Self::from_reader(File::open(path)?)
    }

    /// Parse CSV with a header row
    ///
    /// Values that do not parse as numbers become NaN, except in categorical
    /// columns which keep the raw text.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let target_pos = headers
            .iter()
            .position(|h| h == TARGET_COLUMN)
            .ok_or_else(|| DatasetError::MissingColumn(TARGET_COLUMN.to_string()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_pos)
            .map(|(_, h)| h.clone())
            .collect();
        let categorical: Vec<bool> = columns
            .iter()
            .map(|c| CATEGORICAL_COLUMNS.contains(&c.as_str()))
            .collect();

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(DatasetError::RowLength {
                    row: line,
                    expected: headers.len(),
                    actual: record.len(),
                });
            }
            let mut values = Vec::with_capacity(columns.len());
            for (i, field) in record.iter().enumerate() {
                if i == target_pos {
                    targets.push(field.trim().to_string());
                    continue;
                }
                let is_categorical = categorical[values.len()];
                values.push(if is_categorical {
                    FeatureValue::Category(field.to_string())
                } else {
                    FeatureValue::Number(field.trim().parse().unwrap_or(f64::NAN))
                });
            }
            rows.push(values);
        }

        Self::new(columns, rows, targets)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.to_writer(File::create(path)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.schema.iter().map(String::as_str).collect();
        header.push(TARGET_COLUMN);
        csv_writer.write_record(&header)?;

        for (values, target) in self.rows.iter().zip(&self.targets) {
            let mut record: Vec<String> = values.iter().map(format_value).collect();
            record.push(target.clone());
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Normalize raw records into the training layout
    ///
    /// Exact duplicate rows are dropped, gender is canonicalized, missing
    /// numbers are imputed (median for age and duration, 0 for flags) and
    /// every column is clipped to its valid range. Output columns are `age`,
    /// `gender`, the sorted symptom columns, `symptom_duration`, `smoking`,
    /// `alcohol`; anything else is dropped.
    pub fn clean(&self) -> Result<Dataset, DatasetError> {
        if self.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut seen = HashSet::with_capacity(self.len());
        let kept: Vec<usize> = (0..self.len())
            .filter(|&i| {
                let key: Vec<String> = self.rows[i].iter().map(format_value).collect();
                seen.insert((key, self.targets[i].clone()))
            })
            .collect();
        let deduped = self.subset(&kept);

        let gender_pos = deduped
            .column_index(GENDER_COLUMN)
            .ok_or_else(|| DatasetError::MissingColumn(GENDER_COLUMN.to_string()))?;
        let genders: Vec<FeatureValue> = deduped
            .rows
            .iter()
            .map(|r| FeatureValue::Category(canonical_gender(&r[gender_pos].to_string())))
            .collect();

        let mut cleaned: BTreeMap<String, Vec<FeatureValue>> = BTreeMap::new();
        cleaned.insert(GENDER_COLUMN.to_string(), genders);

        for (column, low, high) in [(AGE_COLUMN, 1.0, 100.0), (DURATION_COLUMN, 1.0, 60.0)] {
            let values = deduped.numeric_column(column)?;
            let fill = median(&values);
            cleaned.insert(
                column.to_string(),
                values
                    .into_iter()
                    .map(|v| FeatureValue::Number(if v.is_nan() { fill } else { v }.clamp(low, high)))
                    .collect(),
            );
        }

        let mut symptom_columns: Vec<String> = deduped
            .columns()
            .iter()
            .filter(|c| symptom_from_column(c).is_some())
            .cloned()
            .collect();
        symptom_columns.sort();

        for column in symptom_columns.iter().map(String::as_str).chain([SMOKING_COLUMN, ALCOHOL_COLUMN]) {
            let values = deduped.numeric_column(column)?;
            cleaned.insert(
                column.to_string(),
                values
                    .into_iter()
                    .map(|v| FeatureValue::Number(if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0).trunc() }))
                    .collect(),
            );
        }

        let mut order = vec![AGE_COLUMN.to_string(), GENDER_COLUMN.to_string()];
        order.extend(symptom_columns);
        order.extend([DURATION_COLUMN, SMOKING_COLUMN, ALCOHOL_COLUMN].map(String::from));

        let mut rows: Vec<Vec<FeatureValue>> = vec![Vec::with_capacity(order.len()); deduped.len()];
        for column in &order {
            if let Some(values) = cleaned.remove(column) {
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        tracing::debug!(
            "Cleaned dataset: {} rows ({} duplicates dropped), {} columns",
            deduped.len(),
            self.len() - deduped.len(),
            order.len()
        );
        Dataset::new(order, rows, deduped.targets)
    }
}

fn format_value(value: &FeatureValue) -> String {
    match value {
        FeatureValue::Number(v) if v.is_nan() => String::new(),
        FeatureValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        other => other.to_string(),
    }
}

fn canonical_gender(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "f" | "" => "female".to_string(),
        "m" => "male".to_string(),
        other => other.to_string(),
    }
}

/// Median of the non-NaN values, 0 when there are none
fn median(values: &[f64]) -> f64 {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return 0.0;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    }
}

/// Indices of a reproducible stratified train/test split
///
/// Every label with at least two rows lands on both sides. Both index lists
/// come back sorted.
pub fn stratified_split(targets: &[String], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, target) in targets.iter().enumerate() {
        by_class.entry(target.as_str()).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(targets.len());
    let mut test = Vec::new();
    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut n_test = (n as f64 * test_fraction).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Per-disease symptom probabilities and duration range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub disease: String,
    pub symptoms: BTreeMap<String, f64>,
    /// Half-open `[min, max)` range of days
    pub duration: (u32, u32),
}

pub const SYMPTOMS: [&str; 14] = [
    "fever",
    "cough",
    "headache",
    "fatigue",
    "sore_throat",
    "shortness_of_breath",
    "nausea",
    "vomiting",
    "diarrhea",
    "chest_pain",
    "dizziness",
    "body_ache",
    "runny_nose",
    "loss_of_taste",
];

const RESPIRATORY: [&str; 3] = ["cough", "shortness_of_breath", "chest_pain"];
const AGE_RELATED: [&str; 3] = ["fatigue", "dizziness", "chest_pain"];

fn profile(disease: &str, symptoms: &[(&str, f64)], duration: (u32, u32)) -> DiseaseProfile {
    DiseaseProfile {
        disease: disease.to_string(),
        symptoms: symptoms.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
        duration,
    }
}

pub fn default_profiles() -> Vec<DiseaseProfile> {
    vec![
        profile(
            "Influenza",
            &[
                ("fever", 0.85),
                ("cough", 0.7),
                ("headache", 0.65),
                ("fatigue", 0.75),
                ("body_ache", 0.8),
                ("sore_throat", 0.55),
                ("runny_nose", 0.45),
            ],
            (2, 8),
        ),
        profile(
            "Common Cold",
            &[
                ("cough", 0.55),
                ("sore_throat", 0.7),
                ("runny_nose", 0.8),
                ("headache", 0.35),
                ("fever", 0.25),
                ("fatigue", 0.3),
            ],
            (2, 7),
        ),
        profile(
            "COVID-19",
            &[
                ("fever", 0.75),
                ("cough", 0.75),
                ("fatigue", 0.8),
                ("shortness_of_breath", 0.55),
                ("loss_of_taste", 0.65),
                ("headache", 0.45),
            ],
            (3, 12),
        ),
        profile(
            "Migraine",
            &[
                ("headache", 0.92),
                ("nausea", 0.45),
                ("vomiting", 0.2),
                ("dizziness", 0.4),
                ("fatigue", 0.35),
            ],
            (1, 4),
        ),
        profile(
            "Gastroenteritis",
            &[
                ("nausea", 0.8),
                ("vomiting", 0.72),
                ("diarrhea", 0.88),
                ("fever", 0.35),
                ("fatigue", 0.45),
            ],
            (1, 5),
        ),
        profile(
            "Hypertension",
            &[("dizziness", 0.5), ("headache", 0.35), ("chest_pain", 0.2), ("fatigue", 0.25)],
            (5, 30),
        ),
        profile(
            "Diabetes",
            &[("fatigue", 0.55), ("dizziness", 0.35), ("nausea", 0.2), ("headache", 0.25)],
            (7, 40),
        ),
        profile(
            "Asthma",
            &[
                ("shortness_of_breath", 0.9),
                ("cough", 0.5),
                ("chest_pain", 0.3),
                ("fatigue", 0.35),
            ],
            (2, 14),
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub num_samples: usize,
    pub seed: u64,
    /// Share of rows re-appended as exact duplicates
    pub duplicate_fraction: f64,
    pub baseline_probability: f64,
    pub smoking_rate: f64,
    pub alcohol_rate: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_samples: 5000,
            seed: 42,
            duplicate_fraction: 0.01,
            baseline_probability: 0.06,
            smoking_rate: 0.28,
            alcohol_rate: 0.42,
        }
    }
}

/// Draw raw patient records from the disease profiles
pub fn generate_synthetic(config: &SyntheticConfig, profiles: &[DiseaseProfile]) -> Result<Dataset, DatasetError> {
    if config.num_samples == 0 || profiles.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let age_distribution =
        Normal::new(43.0, 17.0).map_err(|e| DatasetError::Distribution(e.to_string()))?;

    let mut columns = vec![AGE_COLUMN.to_string(), GENDER_COLUMN.to_string()];
    columns.extend(SYMPTOMS.iter().map(|s| symptom_column(s)));
    columns.extend([DURATION_COLUMN, SMOKING_COLUMN, ALCOHOL_COLUMN].map(String::from));

    let mut rows = Vec::with_capacity(config.num_samples);
    let mut targets = Vec::with_capacity(config.num_samples);

    for _ in 0..config.num_samples {
        let profile = &profiles[rng.gen_range(0..profiles.len())];
        let age = rng.sample(age_distribution).clamp(5.0, 90.0).trunc();
        let gender = if rng.gen_bool(0.5) { "male" } else { "female" };
        let smoking = rng.gen::<f64>() < config.smoking_rate;
        let alcohol = rng.gen::<f64>() < config.alcohol_rate;
        let (low, high) = profile.duration;
        let duration = rng.gen_range(low..high.max(low + 1));

        let mut values = Vec::with_capacity(columns.len());
        values.push(FeatureValue::Number(age));
        values.push(FeatureValue::Category(gender.to_string()));
        for symptom in SYMPTOMS {
            let mut p = profile
                .symptoms
                .get(symptom)
                .copied()
                .unwrap_or(config.baseline_probability);
            if smoking && RESPIRATORY.contains(&symptom) {
                p = (p + 0.08).min(0.97);
            }
            if age > 55.0 && AGE_RELATED.contains(&symptom) {
                p = (p + 0.06).min(0.97);
            }
            values.push(FeatureValue::flag(rng.gen::<f64>() < p));
        }
        values.push(FeatureValue::Number(f64::from(duration)));
        values.push(FeatureValue::flag(smoking));
        values.push(FeatureValue::flag(alcohol));

        rows.push(values);
        targets.push(profile.disease.clone());
    }

    let n_duplicates = (config.num_samples as f64 * config.duplicate_fraction).round() as usize;
    let duplicates = index::sample(&mut rng, config.num_samples, n_duplicates.min(config.num_samples));
    for i in duplicates.into_iter() {
        rows.push(rows[i].clone());
        targets.push(targets[i].clone());
    }

    tracing::info!(
        "Generated {} synthetic rows ({} duplicates) over {} diseases",
        rows.len(),
        n_duplicates,
        profiles.len()
    );
    Dataset::new(columns, rows, targets)
}

/// Columns after one-hot encoding the categorical ones: numeric columns in
/// order, then `<column>_<category>` blocks with sorted categories
pub fn encode_one_hot(dataset: &Dataset) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut categorical = Vec::new();

    for (pos, column) in dataset.columns().iter().enumerate() {
        if CATEGORICAL_COLUMNS.contains(&column.as_str()) {
            categorical.push((pos, column));
            continue;
        }
        names.push(column.clone());
        columns.push(
            dataset
                .rows
                .iter()
                .map(|r| r[pos].as_number().unwrap_or(f64::NAN))
                .collect(),
        );
    }

    for (pos, column) in categorical {
        let values: Vec<String> = dataset.rows.iter().map(|r| r[pos].to_string()).collect();
        let categories: BTreeSet<&String> = values.iter().collect();
        for category in categories {
            names.push(one_hot_column(column, category));
            columns.push(values.iter().map(|v| if v == category { 1.0 } else { 0.0 }).collect());
        }
    }

    (names, columns)
}
