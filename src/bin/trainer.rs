//! Offline tooling for the symptom predictor
//!
//! Generates a cleaned training dataset, trains and selects the best
//! candidate model, and evaluates a saved bundle.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symptom_predictor::config::LoggingSettings;
use symptom_predictor::logging;
use symptom_predictor::models::ModelBundle;
use symptom_predictor::training::{
    default_profiles, evaluate, generate_synthetic, select_features, train, write_json_report,
    Dataset, SelectionMetadata, SyntheticConfig, TrainingConfig,
};
use tracing::info;

/// Symptom predictor training tools
#[derive(Parser, Debug)]
#[command(name = "symptom-trainer")]
#[command(version, about = "Generate data, train and evaluate disease prediction bundles", long_about = None)]
struct Args {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize and clean a patient dataset
    Generate {
        /// Number of patients before duplicates are injected
        #[arg(long, default_value_t = 5000)]
        num_samples: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Cleaned dataset CSV
        #[arg(short, long, default_value = "data/processed/cleaned_symptoms.csv")]
        output: PathBuf,

        /// Feature-selection metadata JSON
        #[arg(long, default_value = "data/processed/feature_metadata.json")]
        metadata: PathBuf,

        /// Number of top mutual-information features to keep
        #[arg(long, default_value_t = 18)]
        top_k: usize,
    },

    /// Train the candidate models and save the best as a bundle
    Train {
        /// Cleaned dataset CSV
        #[arg(short, long, default_value = "data/processed/cleaned_symptoms.csv")]
        dataset: PathBuf,

        /// Bundle artifact to write
        #[arg(short, long, default_value = "model/bundle.json")]
        bundle: PathBuf,

        /// Metrics report to write
        #[arg(long, default_value = "reports/metrics.json")]
        report: PathBuf,

        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Score a saved bundle on the held-out split of a dataset
    Evaluate {
        #[arg(short, long, default_value = "model/bundle.json")]
        bundle: PathBuf,

        #[arg(short, long, default_value = "data/processed/cleaned_symptoms.csv")]
        dataset: PathBuf,

        #[arg(long, default_value = "reports/evaluation.json")]
        report: PathBuf,

        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init(&LoggingSettings {
        level: args.log_level.clone(),
        format: "compact".to_string(),
    });

    match args.command {
        Commands::Generate { num_samples, seed, output, metadata, top_k } => {
            let config = SyntheticConfig { num_samples, seed, ..SyntheticConfig::default() };
            let raw = generate_synthetic(&config, &default_profiles())
                .context("Failed to generate synthetic dataset")?;
            let cleaned = raw.clean().context("Failed to clean dataset")?;
            info!("Generated {} rows, {} after cleaning", raw.len(), cleaned.len());

            cleaned
                .write_csv(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let selection = select_features(&cleaned, top_k);
            info!("Selected {} encoded features", selection.selected.len());
            write_json_report(&metadata, &SelectionMetadata::new(&selection, &cleaned))
                .with_context(|| format!("Failed to write {}", metadata.display()))?;

            info!("Saved dataset to {}", output.display());
        }

        Commands::Train { dataset, bundle, report, test_fraction, seed } => {
            let data = Dataset::read_csv(&dataset)
                .with_context(|| format!("Failed to read {}", dataset.display()))?;
            let config = TrainingConfig { test_fraction, seed, ..TrainingConfig::default() };

            let outcome = train(&data, &config).context("Training failed")?;
            outcome
                .artifact
                .save(&bundle)
                .with_context(|| format!("Failed to write {}", bundle.display()))?;
            write_json_report(&report, &outcome.report)
                .with_context(|| format!("Failed to write {}", report.display()))?;

            info!("Best model: {}", outcome.report.best_model);
            info!("Saved bundle to {}", bundle.display());
        }

        Commands::Evaluate { bundle, dataset, report, test_fraction, seed } => {
            let model = ModelBundle::load(&bundle)
                .with_context(|| format!("Failed to load bundle {}", bundle.display()))?;
            let data = Dataset::read_csv(&dataset)
                .with_context(|| format!("Failed to read {}", dataset.display()))?;

            let evaluation = evaluate(&model, &data, test_fraction, seed).context("Evaluation failed")?;
            write_json_report(&report, &evaluation)
                .with_context(|| format!("Failed to write {}", report.display()))?;

            info!(
                "{} accuracy {:.4}, weighted F1 {:.4}",
                evaluation.best_model, evaluation.accuracy, evaluation.weighted_avg.f1_score
            );
        }
    }

    Ok(())
}
