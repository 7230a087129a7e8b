//! Model bundle: the trained classifier plus everything serving needs to
//! rebuild its inputs and explain its outputs.
//!
//! Two forms exist:
//!
//! - [`BundleArtifact`] is the on-disk JSON document written by training.
//!   Every field is optional so that a missing field can be reported by name.
//! - [`ModelBundle`] is the validated, immutable in-memory form shared by all
//!   requests. Construction checks the schema invariants once; nothing
//!   mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use crate::core::features::{symptom_column, symptom_from_column, FeatureSchema, DURATION_COLUMN};
use crate::ml::{Classifier, FittedPipeline, ImportanceStrategy, LabelEncoder};
use crate::models::domain::ModelMetrics;

/// Errors that can occur while loading or validating a bundle
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model bundle is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("model bundle I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model bundle serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid model bundle: {0}")]
    Invalid(String),
}

/// Known symptoms in column-layout order, with constant-time membership
#[derive(Debug, Clone, Default)]
pub struct SymptomVocabulary {
    ordered: Vec<String>,
    index: HashSet<String>,
}

impl SymptomVocabulary {
    pub fn new(symptoms: Vec<String>) -> Result<Self, SchemaError> {
        let mut index = HashSet::with_capacity(symptoms.len());
        for symptom in &symptoms {
            if symptom.is_empty() || symptom.trim() != symptom || symptom.to_lowercase() != *symptom {
                return Err(SchemaError::Invalid(format!(
                    "symptom '{}' is not in canonical lowercase form",
                    symptom
                )));
            }
            if symptom_column(symptom) == DURATION_COLUMN {
                return Err(SchemaError::Invalid(format!(
                    "symptom '{}' collides with the '{}' column",
                    symptom, DURATION_COLUMN
                )));
            }
            if !index.insert(symptom.clone()) {
                return Err(SchemaError::Invalid(format!("duplicate symptom '{}'", symptom)));
            }
        }
        Ok(Self { ordered: symptoms, index })
    }

    pub fn contains(&self, symptom: &str) -> bool {
        self.index.contains(symptom)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Global importance per symptom with a precomputed descending ranking
#[derive(Debug, Clone, Default)]
pub struct SymptomImportance {
    scores: HashMap<String, f64>,
    ranking: Vec<(String, f64)>,
}

impl SymptomImportance {
    /// Build from scored symptoms
    ///
    /// The iteration order of `entries` breaks score ties in the ranking. A
    /// repeated symptom keeps its first position and its last score.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut scores = HashMap::new();
        let mut ranking: Vec<(String, f64)> = Vec::new();
        for (symptom, score) in entries {
            let symptom = symptom.into();
            match ranking.iter_mut().find(|(s, _)| *s == symptom) {
                Some(entry) => entry.1 = score,
                None => ranking.push((symptom.clone(), score)),
            }
            scores.insert(symptom, score);
        }
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { scores, ranking }
    }

    pub fn score(&self, symptom: &str) -> Option<f64> {
        self.scores.get(symptom).copied()
    }

    /// Symptoms sorted by score, highest first
    pub fn ranking(&self) -> &[(String, f64)] {
        &self.ranking
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.ranking.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }
}

/// Unvalidated pieces of a bundle
pub struct BundleParts {
    pub classifier: Arc<dyn Classifier>,
    pub known_symptoms: Vec<String>,
    pub feature_columns: Vec<String>,
    pub classes: Vec<String>,
    pub label_encoder: Option<LabelEncoder>,
    pub symptom_importance: BTreeMap<String, f64>,
    pub metrics: BTreeMap<String, ModelMetrics>,
    pub best_model_name: String,
    pub importance_strategy: Option<ImportanceStrategy>,
}

/// Immutable, validated model bundle
#[derive(Debug)]
pub struct ModelBundle {
    classifier: Arc<dyn Classifier>,
    vocabulary: SymptomVocabulary,
    feature_columns: FeatureSchema,
    classes: Vec<String>,
    label_encoder: Option<LabelEncoder>,
    importance: SymptomImportance,
    metrics: BTreeMap<String, ModelMetrics>,
    best_model_name: String,
    importance_strategy: Option<ImportanceStrategy>,
}

impl ModelBundle {
    /// Validate `parts` and freeze them into a bundle
    pub fn new(parts: BundleParts) -> Result<Self, SchemaError> {
        if parts.feature_columns.is_empty() {
            return Err(SchemaError::Invalid("feature_columns is empty".to_string()));
        }
        let mut seen = HashSet::with_capacity(parts.feature_columns.len());
        if let Some(dup) = parts.feature_columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(SchemaError::Invalid(format!("duplicate feature column '{}'", dup)));
        }

        let vocabulary = SymptomVocabulary::new(parts.known_symptoms)?;
        let mut symptom_columns = 0;
        for column in &parts.feature_columns {
            if let Some(symptom) = symptom_from_column(column) {
                if !vocabulary.contains(symptom) {
                    return Err(SchemaError::Invalid(format!(
                        "feature column '{}' has no known symptom",
                        column
                    )));
                }
                symptom_columns += 1;
            }
        }
        if symptom_columns != vocabulary.len() {
            return Err(SchemaError::Invalid(format!(
                "{} known symptoms but {} symptom columns",
                vocabulary.len(),
                symptom_columns
            )));
        }

        for (symptom, score) in &parts.symptom_importance {
            if !vocabulary.contains(symptom) {
                return Err(SchemaError::Invalid(format!(
                    "importance given for unknown symptom '{}'",
                    symptom
                )));
            }
            if !score.is_finite() || *score < 0.0 {
                return Err(SchemaError::Invalid(format!(
                    "importance of '{}' must be a non-negative number",
                    symptom
                )));
            }
        }
        // Unscored symptoms rank at zero; ties follow the vocabulary order
        let importance = SymptomImportance::new(vocabulary.iter().map(|symptom| {
            let score = parts.symptom_importance.get(symptom).copied().unwrap_or(0.0);
            (symptom.to_string(), score)
        }));

        if parts.classes.is_empty() {
            return Err(SchemaError::Invalid("classes is empty".to_string()));
        }
        let native = parts.classifier.classes().len();
        if native != parts.classes.len() {
            return Err(SchemaError::Invalid(format!(
                "classifier has {} classes but the bundle lists {}",
                native,
                parts.classes.len()
            )));
        }
        if let Some(encoder) = &parts.label_encoder {
            if encoder.len() != parts.classes.len() {
                return Err(SchemaError::Invalid(format!(
                    "label encoder has {} classes but the bundle lists {}",
                    encoder.len(),
                    parts.classes.len()
                )));
            }
        }

        Ok(Self {
            classifier: parts.classifier,
            vocabulary,
            feature_columns: parts.feature_columns.into(),
            classes: parts.classes,
            label_encoder: parts.label_encoder,
            importance,
            metrics: parts.metrics,
            best_model_name: parts.best_model_name,
            importance_strategy: parts.importance_strategy,
        })
    }

    /// Read and validate a bundle artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        BundleArtifact::read(path)?.into_bundle()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn feature_columns(&self) -> &FeatureSchema {
        &self.feature_columns
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn label_encoder(&self) -> Option<&LabelEncoder> {
        self.label_encoder.as_ref()
    }

    pub fn symptom_importance(&self) -> &SymptomImportance {
        &self.importance
    }

    pub fn metrics(&self) -> &BTreeMap<String, ModelMetrics> {
        &self.metrics
    }

    pub fn best_model_name(&self) -> &str {
        &self.best_model_name
    }

    pub fn importance_strategy(&self) -> Option<ImportanceStrategy> {
        self.importance_strategy
    }
}

/// Serialized bundle as written by training
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleArtifact {
    pub classifier: Option<FittedPipeline>,
    pub best_model_name: Option<String>,
    pub known_symptoms: Option<Vec<String>>,
    pub feature_columns: Option<Vec<String>>,
    pub classes: Option<Vec<String>>,
    pub symptom_importance: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub label_encoder: Option<LabelEncoder>,
    #[serde(default)]
    pub importance_strategy: Option<ImportanceStrategy>,
    #[serde(default)]
    pub metrics: BTreeMap<String, ModelMetrics>,
}

impl BundleArtifact {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SchemaError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Check that every required field is present, then validate
    pub fn into_bundle(self) -> Result<ModelBundle, SchemaError> {
        let classifier = self.classifier.ok_or(SchemaError::MissingField("classifier"))?;
        let best_model_name = self
            .best_model_name
            .ok_or(SchemaError::MissingField("best_model_name"))?;
        let known_symptoms = self
            .known_symptoms
            .ok_or(SchemaError::MissingField("known_symptoms"))?;
        let feature_columns = self
            .feature_columns
            .ok_or(SchemaError::MissingField("feature_columns"))?;
        let classes = self.classes.ok_or(SchemaError::MissingField("classes"))?;
        let symptom_importance = self
            .symptom_importance
            .ok_or(SchemaError::MissingField("symptom_importance"))?;

        ModelBundle::new(BundleParts {
            classifier: Arc::new(classifier),
            known_symptoms,
            feature_columns,
            classes,
            label_encoder: self.label_encoder,
            symptom_importance,
            metrics: self.metrics,
            best_model_name,
            importance_strategy: self.importance_strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{names, FixedClassifier};

    fn parts(columns: &[&str], known: &[&str]) -> BundleParts {
        BundleParts {
            classifier: Arc::new(FixedClassifier {
                labels: names(&["A", "B"]),
                probabilities: vec![0.5, 0.5],
            }),
            known_symptoms: known.iter().map(|s| s.to_string()).collect(),
            feature_columns: columns.iter().map(|s| s.to_string()).collect(),
            classes: vec!["A".to_string(), "B".to_string()],
            label_encoder: None,
            symptom_importance: BTreeMap::new(),
            metrics: BTreeMap::new(),
            best_model_name: "Fixed".to_string(),
            importance_strategy: None,
        }
    }

    #[test]
    fn test_valid_bundle() {
        let mut p = parts(&["age", "symptom_fever", "symptom_cough", "symptom_duration"], &["fever", "cough"]);
        p.symptom_importance = [("cough".to_string(), 0.2), ("fever".to_string(), 0.2)].into();
        let bundle = ModelBundle::new(p).unwrap();

        assert_eq!(bundle.vocabulary().len(), 2);
        // Equal scores rank in vocabulary order
        let ranking: Vec<&str> = bundle
            .symptom_importance()
            .ranking()
            .iter()
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(ranking, vec!["fever", "cough"]);
    }

    #[test]
    fn test_symptom_cardinality_mismatch() {
        let p = parts(&["age", "symptom_fever"], &["fever", "cough"]);
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_duration_symptom_rejected() {
        let result = SymptomVocabulary::new(vec!["duration".to_string(), "fever".to_string()]);
        match result {
            Err(SchemaError::Invalid(message)) => assert!(message.contains("symptom_duration")),
            other => panic!("unexpected result: {other:?}"),
        }

        let p = parts(
            &["symptom_fever", "symptom_cough", "symptom_duration"],
            &["duration", "fever"],
        );
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_symptom_column_must_be_known() {
        let p = parts(&["age", "symptom_fever", "symptom_rash"], &["fever", "cough"]);
        match ModelBundle::new(p) {
            Err(SchemaError::Invalid(message)) => assert!(message.contains("symptom_rash")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unscored_symptoms_rank_at_zero() {
        let mut p = parts(
            &["symptom_fever", "symptom_cough", "symptom_headache"],
            &["fever", "cough", "headache"],
        );
        p.symptom_importance = [("headache".to_string(), 0.7)].into();
        let bundle = ModelBundle::new(p).unwrap();
        let importance = bundle.symptom_importance();

        assert_eq!(importance.len(), 3);
        assert_eq!(importance.score("cough"), Some(0.0));
        let ranking: Vec<&str> = importance.ranking().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(ranking, vec!["headache", "fever", "cough"]);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let p = parts(&["age", "age", "symptom_fever"], &["fever"]);
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_importance_must_reference_known_symptoms() {
        let mut p = parts(&["symptom_fever"], &["fever"]);
        p.symptom_importance = [("rash".to_string(), 0.2)].into();
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));

        let mut p = parts(&["symptom_fever"], &["fever"]);
        p.symptom_importance = [("fever".to_string(), -0.1)].into();
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_class_count_must_match_classifier() {
        let mut p = parts(&["symptom_fever"], &["fever"]);
        p.classes.push("C".to_string());
        assert!(matches!(ModelBundle::new(p), Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_missing_field_is_named() {
        let artifact: BundleArtifact = serde_json::from_str(
            r#"{"best_model_name": "X", "known_symptoms": [], "feature_columns": ["age"], "classes": ["A"], "symptom_importance": {}}"#,
        )
        .unwrap();
        match artifact.into_bundle() {
            Err(SchemaError::MissingField(field)) => assert_eq!(field, "classifier"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_importance_ranking_with_repeats() {
        let importance = SymptomImportance::new([("a", 0.1), ("b", 0.5), ("a", 0.9)]);
        assert_eq!(importance.len(), 2);
        assert_eq!(importance.score("a"), Some(0.9));
        assert_eq!(importance.ranking()[0].0, "a");
    }
}
