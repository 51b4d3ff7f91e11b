use utoipa::OpenApi;

/// OpenAPI Specification Documentation
///
/// Describes the REST surface of the verification service. The document is
/// generated at compile time from the `#[utoipa::path]` annotations on the
/// handlers and served alongside Swagger UI.
///
/// # Endpoints
/// - Health Check: `GET /api/v1/health`
/// - Single verification: `POST /api/v1/validate`
/// - Bulk submission: `POST /api/v1/bulk-validate`
/// - Bulk progress: `GET /api/v1/progress/{job_id}`
/// - Result download: `GET /api/v1/download/{filename}`
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::email::validate_email,
        crate::routes::email::bulk_validate,
        crate::routes::email::get_progress,
        crate::routes::email::download_result,
    ),
    components(
        schemas(
            crate::models::health::HealthResponse,
            crate::models::email::EmailRequest,
            crate::models::email::EmailVerdictResponse,
            crate::models::email::BulkUploadRequest,
            crate::models::email::JobAcceptedResponse,
            crate::models::email::ProgressResponse,
            crate::models::email::ErrorResponse,
            crate::models::verdict::Verdict
        )
    ),
    tags(
        (name = "Health Check", description = "Service health monitoring endpoints"),
        (name = "Email Verification", description = "Format, MX and SMTP verification of addresses")
    ),
    info(
        description = "Email address verification by format check, MX lookup and SMTP probe, for single addresses and uploaded lists",
        title = "Email Verifier API",
        version = "0.3.0",
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/health",
            "/api/v1/validate",
            "/api/v1/bulk-validate",
            "/api/v1/progress/{job_id}",
            "/api/v1/download/{filename}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
