use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use symptom_predictor::config::Settings;
use symptom_predictor::routes::{self, AppState};
use symptom_predictor::{logging, ModelBundle, PredictionLimits, Predictor};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    logging::init(&settings.logging);

    info!("Starting symptom prediction service...");

    let bundle = ModelBundle::load(&settings.model.bundle_path).map_err(|e| {
        error!("Failed to load model bundle from {}: {}", settings.model.bundle_path, e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;

    info!(
        "Loaded {} bundle: {} diseases, {} symptoms",
        bundle.best_model_name(),
        bundle.classes().len(),
        bundle.vocabulary().len()
    );

    let limits = PredictionLimits::from(&settings.prediction);
    let predictor = Predictor::new(Arc::new(bundle), limits);

    info!("Predictor initialized with limits: {:?}", limits);

    // Build application state
    let app_state = AppState::new(predictor);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting HTTP server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    });

    let server = match settings.server.workers {
        Some(workers) => server.workers(workers),
        None => server,
    };

    server.bind((host, port))?.run().await
}
