// Criterion benchmarks for the symptom predictor

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use symptom_predictor::core::{build_feature_row, normalize_symptoms, select_important_symptoms};
use symptom_predictor::ml::{CandidateModel, GaussianNb, LogisticRegression, RandomForest};
use symptom_predictor::models::{ModelBundle, PredictRequest};
use symptom_predictor::training::{default_profiles, generate_synthetic, train, SyntheticConfig, TrainingConfig};
use symptom_predictor::Predictor;

fn train_bundle(candidate: CandidateModel) -> Arc<ModelBundle> {
    let config = SyntheticConfig { num_samples: 1000, ..Default::default() };
    let dataset = generate_synthetic(&config, &default_profiles())
        .unwrap()
        .clean()
        .unwrap();
    let training = TrainingConfig { candidates: vec![candidate], ..Default::default() };
    Arc::new(train(&dataset, &training).unwrap().artifact.into_bundle().unwrap())
}

fn create_request() -> PredictRequest {
    serde_json::from_value(serde_json::json!({
        "age": 52,
        "gender": "male",
        "symptoms": ["Fever", "cough", "fatigue", "shortness_of_breath"],
        "duration_days": 6,
        "lifestyle": {"smoking": true}
    }))
    .unwrap()
}

fn bench_predict(c: &mut Criterion) {
    let request = create_request();
    let candidates = [
        CandidateModel::LogisticRegression(LogisticRegression::default()),
        CandidateModel::RandomForest(RandomForest { n_trees: 50, ..Default::default() }),
        CandidateModel::GaussianNb(GaussianNb::default()),
    ];

    let mut group = c.benchmark_group("predict");

    for candidate in candidates {
        let name = candidate.name();
        let predictor = Predictor::with_default_limits(train_bundle(candidate));

        group.bench_with_input(BenchmarkId::new("pipeline", name), &request, |b, request| {
            b.iter(|| predictor.predict(black_box(request)))
        });
    }

    group.finish();
}

fn bench_pipeline_stages(c: &mut Criterion) {
    let bundle = train_bundle(CandidateModel::GaussianNb(GaussianNb::default()));
    let request = create_request();
    let symptoms = normalize_symptoms(&request.symptoms, bundle.vocabulary()).unwrap();

    c.bench_function("normalize_symptoms", |b| {
        b.iter(|| normalize_symptoms(black_box(&request.symptoms), bundle.vocabulary()))
    });

    c.bench_function("build_feature_row", |b| {
        b.iter(|| build_feature_row(black_box(&request), black_box(&symptoms), &bundle))
    });

    c.bench_function("select_important_symptoms", |b| {
        b.iter(|| select_important_symptoms(black_box(&symptoms), bundle.symptom_importance(), 3))
    });
}

criterion_group!(benches, bench_predict, bench_pipeline_stages);

criterion_main!(benches);
