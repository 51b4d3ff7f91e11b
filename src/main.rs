use actix_web::{App, HttpServer, middleware::Logger, web};
use email_verifier::config::AppConfig;
use email_verifier::job_registry::JobRegistry;
use email_verifier::logger;
use email_verifier::openapi::ApiDoc;
use email_verifier::results::ResultStore;
use email_verifier::validation::EmailVerifier;
use email_verifier::worker::BulkJobRunner;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Email Verifier Service Entry Point
///
/// Configures and launches the Actix-web HTTP server with:
/// - Verification endpoints under `/api/v1`
/// - Swagger UI for API documentation
/// - Environment configuration via `.env` file
/// - One process-wide job registry shared by all workers
///
/// # Endpoints
/// - REST: `/api/v1/...` (configured in routes)
/// - Swagger UI: `/swagger-ui/`
/// - OpenAPI document: `/api-docs/openapi.json`
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    logger::init_logger();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&config.upload_dir)?;
    let store = ResultStore::open(&config.results_dir)?;
    let verifier = EmailVerifier::from_config(&config);
    let runner = BulkJobRunner::new(verifier.clone(), store.clone());
    let registry = web::Data::new(JobRegistry::new());

    let bind = (config.bind_address.clone(), config.port);
    tracing::info!(
        address = %bind.0,
        port = bind.1,
        results_dir = %config.results_dir.display(),
        "starting email verifier"
    );

    let max_upload_bytes = config.max_upload_bytes;
    let config = web::Data::new(config);
    let verifier = web::Data::new(verifier);
    let runner = web::Data::new(runner);
    let store = web::Data::new(store);

    HttpServer::new(move || {
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(Logger::default())
            .app_data(email_verifier::routes::multipart_config(max_upload_bytes))
            .app_data(config.clone())
            .app_data(registry.clone())
            .app_data(verifier.clone())
            .app_data(runner.clone())
            .app_data(store.clone())
            .configure(email_verifier::routes::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
    })
    .bind(bind)?
    .run()
    .await
}
