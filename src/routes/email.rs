use actix_multipart::form::MultipartForm;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{Local, Utc};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::input;
use crate::job_registry::{Job, JobRegistry, JobStatus};
use crate::models::email::{
    BulkUploadForm, BulkUploadRequest, EmailRequest, EmailVerdictResponse, ErrorResponse,
    JobAcceptedResponse, ProgressResponse,
};
use crate::results::{self, ResultStore};
use crate::validation::EmailVerifier;
use crate::worker::BulkJobRunner;

const DOWNLOAD_PATH: &str = "/api/v1/download";

impl From<&Job> for ProgressResponse {
    fn from(job: &Job) -> Self {
        match &job.status {
            JobStatus::Running => Self::Running {
                progress: job.progress,
                current: job.current,
                total: job.total,
                email: job.current_email.clone(),
            },
            JobStatus::Completed { artifact } => Self::Completed {
                filename: artifact.clone(),
                download_url: format!("{DOWNLOAD_PATH}/{artifact}"),
            },
            JobStatus::Failed { message } => Self::Failed {
                message: message.clone(),
            },
        }
    }
}

/// # Single Address Verification
///
/// Runs the format, MX and SMTP checks for one address and returns its verdict.
/// The address is trimmed first; an empty address is rejected.
///
/// ## Example Request
/// ```json
/// { "email": "user@example.com" }
/// ```
///
/// ## Example Response
/// ```json
/// { "email": "user@example.com", "verdict": "Valid" }
/// ```
#[utoipa::path(
    post,
    path = "/api/v1/validate",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Verification verdict", body = EmailVerdictResponse),
        (status = 400, description = "Missing address", body = ErrorResponse)
    ),
    tag = "Email Verification"
)]
#[post("/validate")]
pub async fn validate_email(
    req: web::Json<EmailRequest>,
    verifier: web::Data<EmailVerifier>,
) -> impl Responder {
    let email = req.email.trim();
    if email.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new("Email address is required"));
    }

    let verdict = verifier.verify(email).await;
    tracing::info!(email, %verdict, "single address verified");

    HttpResponse::Ok().json(EmailVerdictResponse {
        email: email.to_string(),
        verdict,
    })
}

/// # Bulk Verification Submission
///
/// Accepts a `multipart/form-data` upload whose `file` part is a CSV, TXT,
/// XLSX or XLS file. Addresses are taken from the first column, no header
/// row. The file is verified in the background; poll `/progress/{job_id}`
/// with the returned id.
///
/// ## Example
/// ```text
/// curl -F file=@list.csv http://localhost:8080/api/v1/bulk-validate
/// ```
#[utoipa::path(
    post,
    path = "/api/v1/bulk-validate",
    request_body(content = BulkUploadRequest, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted", body = JobAcceptedResponse),
        (status = 400, description = "No file, no file name or unsupported file type", body = ErrorResponse),
        (status = 500, description = "Upload could not be stored", body = ErrorResponse)
    ),
    tag = "Email Verification"
)]
#[post("/bulk-validate")]
pub async fn bulk_validate(
    MultipartForm(form): MultipartForm<BulkUploadForm>,
    registry: web::Data<JobRegistry>,
    runner: web::Data<BulkJobRunner>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    registry.evict_stale(Utc::now(), config.job_ttl);

    let Some(file) = form.file else {
        return HttpResponse::BadRequest().json(ErrorResponse::new("No file uploaded"));
    };
    let filename = file.file_name.as_deref().map(str::trim).unwrap_or_default();
    if filename.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new("No file selected"));
    }
    let extension = match input::allowed_extension(filename) {
        Ok(extension) => extension,
        Err(err) => {
            tracing::info!(filename, "upload rejected: unsupported file type");
            return HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
        }
    };

    let upload = config.upload_dir.join(format!(
        "upload_{}_{}.{extension}",
        Local::now().format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().simple()
    ));
    if let Err(err) = tokio::fs::copy(file.file.path(), &upload).await {
        tracing::error!(path = %upload.display(), error = %err, "could not store upload");
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::new("Could not store uploaded file"));
    }

    let job = registry.create(Utc::now());
    let job_id = job.id().to_string();
    tracing::info!(%job_id, filename, bytes = file.size, "bulk upload accepted");
    runner.spawn(upload, job);

    HttpResponse::Accepted().json(JobAcceptedResponse { job_id })
}

/// # Bulk Job Progress
///
/// Reports a running job's progress, or its artifact name once completed,
/// or its failure message.
#[utoipa::path(
    get,
    path = "/api/v1/progress/{job_id}",
    params(
        ("job_id" = String, Path, description = "Identifier returned by bulk-validate")
    ),
    responses(
        (status = 200, description = "Job state", body = ProgressResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Email Verification"
)]
#[get("/progress/{job_id}")]
pub async fn get_progress(
    path: web::Path<String>,
    registry: web::Data<JobRegistry>,
) -> impl Responder {
    match registry.get(&path.into_inner()) {
        Some(job) => HttpResponse::Ok().json(ProgressResponse::from(&job)),
        None => HttpResponse::NotFound().json(ErrorResponse::new("Job not found")),
    }
}

/// # Result Download
///
/// Serves a completed result artifact. Only names of the form
/// `Validated_emails_<timestamp>.csv` are served.
#[utoipa::path(
    get,
    path = "/api/v1/download/{filename}",
    params(
        ("filename" = String, Path, description = "Artifact name reported by the progress endpoint")
    ),
    responses(
        (status = 200, description = "Result CSV", content_type = "text/csv", body = String),
        (status = 404, description = "Invalid or unknown file name", body = ErrorResponse)
    ),
    tag = "Email Verification"
)]
#[get("/download/{filename}")]
pub async fn download_result(
    path: web::Path<String>,
    store: web::Data<ResultStore>,
) -> impl Responder {
    let filename = path.into_inner();
    if !results::is_artifact_name(&filename) {
        return HttpResponse::NotFound().json(ErrorResponse::new("Invalid filename"));
    }

    let Some(file) = store.locate(&filename) else {
        return HttpResponse::NotFound().json(ErrorResponse::new("File not found"));
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ))
            .body(bytes),
        Err(err) => {
            tracing::warn!(%filename, error = %err, "artifact unreadable");
            HttpResponse::NotFound().json(ErrorResponse::new("File not found"))
        }
    }
}

/// Configures verification routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(validate_email)
        .service(bulk_validate)
        .service(get_progress)
        .service(download_result);
}
