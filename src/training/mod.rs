// Offline tooling: dataset preparation, training and evaluation
pub mod dataset;
pub mod evaluate;
pub mod metrics;
pub mod selection;
pub mod trainer;

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub use dataset::{
    default_profiles, generate_synthetic, stratified_split, Dataset, DatasetError, DiseaseProfile,
    SyntheticConfig, TARGET_COLUMN,
};
pub use evaluate::{evaluate, EvaluationReport};
pub use metrics::{ClassScores, ClassificationReport};
pub use selection::{select_features, FeatureSelection, SelectionMetadata, PROTECTED_FEATURES};
pub use trainer::{
    aggregate_symptom_importance, select_best, train, TrainingConfig, TrainingError, TrainingOutcome,
    TrainingReport,
};

/// Write `value` as pretty JSON, creating parent directories
pub fn write_json_report<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
