use actix_multipart::form::MultipartFormConfig;
use actix_web::{HttpResponse, ResponseError, error::InternalError, web};

use crate::models::email::ErrorResponse;

/// # Health Check Endpoint
///
/// Returns the current health status of the service along with a timestamp.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "UP",
///   "timestamp": "2023-10-05T12:34:56.789Z",
///   "tracked_jobs": 0
/// }
/// ```
pub mod health;

/// # Email Verification Endpoints
///
/// - `POST /validate`: verify one address synchronously
/// - `POST /bulk-validate`: submit a multipart file upload for background verification
/// - `GET /progress/{job_id}`: poll a bulk job
/// - `GET /download/{filename}`: fetch a completed result file
pub mod email;

/// JSON extractor settings: payload errors are answered with `{ "error": ... }`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::info!(error = %err, "rejected JSON payload");
        let response = HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

/// Multipart upload settings: the whole form is capped at `max_upload_bytes`
/// and malformed or oversized uploads are answered with `{ "error": ... }`.
pub fn multipart_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_upload_bytes)
        .error_handler(|err, _req| {
            tracing::info!(error = %err, "rejected upload");
            let response =
                HttpResponse::build(err.status_code()).json(ErrorResponse::new(err.to_string()));
            InternalError::from_response(err, response).into()
        })
}

/// # API Route Configuration
///
/// Sets up versioned API endpoints under the `/api/v1` base path.
///
/// ## Example Endpoints
///
/// ```text
/// GET  /api/v1/health
/// POST /api/v1/validate
/// POST /api/v1/bulk-validate            (multipart field `file`)
/// GET  /api/v1/progress/{job_id}
/// GET  /api/v1/download/{filename}
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .configure(health::configure_routes)
            .configure(email::configure_routes),
    );
}
