use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{PredictError, Predictor, ValidationError};
use crate::models::{
    ErrorResponse, GlobalSymptomImportance, HealthResponse, InputSummary, MetadataResponse,
    ModelInfoResponse, PredictRequest, PredictResponse,
};

/// Number of symptoms listed by the model-info endpoint
const TOP_GLOBAL_SYMPTOMS: usize = 10;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub predictor: Predictor,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self { predictor }
    }
}

/// Configure all prediction-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/metadata", web::get().to(metadata))
        .route("/model-info", web::get().to(model_info))
        .route("/predict", web::post().to(predict));
}

fn error_body(error: &str, message: String, status_code: u16) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        message,
        status_code,
        unknown_symptoms: None,
    }
}

/// Map a pipeline error onto its HTTP response
pub fn predict_error_response(err: &PredictError) -> HttpResponse {
    match err {
        PredictError::Validation(ValidationError::NoSymptoms) => HttpResponse::BadRequest().json(
            error_body("no_symptoms", "At least one symptom is required".to_string(), 400),
        ),
        PredictError::Validation(ValidationError::UnknownSymptoms(unknown)) => {
            HttpResponse::BadRequest().json(ErrorResponse {
                unknown_symptoms: Some(unknown.clone()),
                ..error_body("unknown_symptoms", format!("Unknown symptoms: {}", unknown.join(", ")), 400)
            })
        }
        PredictError::Inference(e) => {
            tracing::error!("Inference failed: {}", e);
            HttpResponse::InternalServerError()
                .json(error_body("inference_error", format!("Prediction failed: {}", e.0), 500))
        }
        PredictError::Internal(message) => {
            tracing::error!("Prediction pipeline failed: {}", message);
            HttpResponse::InternalServerError()
                .json(error_body("internal_error", "Prediction failed".to_string(), 500))
        }
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let bundle = state.predictor.bundle();

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        best_model: bundle.best_model_name().to_string(),
        num_diseases: bundle.classes().len(),
        num_symptoms: bundle.vocabulary().len(),
    })
}

/// GET /api/v1/metadata
async fn metadata(state: web::Data<AppState>) -> impl Responder {
    let bundle = state.predictor.bundle();

    HttpResponse::Ok().json(MetadataResponse {
        symptoms: bundle.vocabulary().as_slice().to_vec(),
        diseases: bundle.classes().to_vec(),
    })
}

/// GET /api/v1/model-info
async fn model_info(state: web::Data<AppState>) -> impl Responder {
    let bundle = state.predictor.bundle();
    let top_global_symptoms = bundle
        .symptom_importance()
        .ranking()
        .iter()
        .take(TOP_GLOBAL_SYMPTOMS)
        .map(|(symptom, score)| GlobalSymptomImportance {
            symptom: symptom.clone(),
            importance: (score * 100_000.0).round() / 100_000.0,
        })
        .collect();

    HttpResponse::Ok().json(ModelInfoResponse {
        best_model: bundle.best_model_name().to_string(),
        metrics: bundle.metrics().clone(),
        importance_strategy: bundle.importance_strategy(),
        top_global_symptoms,
    })
}

/// Predict endpoint
///
/// POST /api/v1/predict
///
/// Request body:
/// ```json
/// {
///   "age": 30,
///   "gender": "male",
///   "symptoms": ["fever", "cough"],
///   "duration_days": 3,
///   "lifestyle": {"smoking": false, "alcohol": false}
/// }
/// ```
async fn predict(state: web::Data<AppState>, req: web::Json<PredictRequest>) -> impl Responder {
    let request = req.into_inner();

    if let Err(errors) = request.validate() {
        tracing::info!("Validation failed for predict request: {}", errors);
        return HttpResponse::BadRequest().json(error_body("validation_error", errors.to_string(), 400));
    }

    // The classifier call is CPU-bound; a panic in it surfaces as a blocking error
    let predictor = state.predictor.clone();
    let outcome = web::block(move || {
        let result = predictor.predict(&request);
        (request, result)
    })
    .await;

    let (request, result) = match outcome {
        Ok(pair) => pair,
        Err(e) => return predict_error_response(&PredictError::Internal(e.to_string())),
    };

    match result {
        Ok(prediction) => {
            tracing::info!(
                "Predicted {:?} from {} symptoms",
                prediction.predictions.first().map(|p| p.disease.as_str()),
                prediction.symptoms.len()
            );
            HttpResponse::Ok().json(PredictResponse {
                input_summary: InputSummary {
                    age: request.age,
                    gender: request.gender,
                    duration_days: request.duration_days,
                    symptom_count: prediction.symptoms.len(),
                },
                predictions: prediction.predictions,
                important_symptoms: prediction.important_symptoms,
                model_used: state.predictor.bundle().best_model_name().to_string(),
            })
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::info!("Rejected predict request: {}", e);
            }
            predict_error_response(&e)
        }
    }
}
