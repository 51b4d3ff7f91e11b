use crate::job_registry::JobRegistry;
use crate::models::HealthResponse;
use actix_web::{HttpResponse, Responder, get, web};

/// # Health Check Endpoint
///
/// Returns the current health status of the service along with a timestamp
/// and the number of bulk jobs currently tracked.
///
/// ## Response
///
/// - **200 OK**: Service is healthy
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
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health Check"
)]
#[get("/health")]
pub async fn health(registry: web::Data<JobRegistry>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::up(registry.len()))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
