use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::verdict::Verdict;

#[derive(Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct EmailVerdictResponse {
    pub email: String,
    pub verdict: Verdict,
}

/// Multipart form of a bulk submission. `file` is absent when the form
/// carries no part of that name.
#[derive(Debug, MultipartForm)]
pub struct BulkUploadForm {
    pub file: Option<TempFile>,
}

/// OpenAPI shape of [`BulkUploadForm`].
#[derive(ToSchema)]
pub struct BulkUploadRequest {
    /// CSV, TXT, XLSX or XLS file; addresses in the first column, no header row.
    pub file: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct JobAcceptedResponse {
    pub job_id: String,
}

/// Poll response for a bulk job, tagged by `status`.
#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressResponse {
    Running {
        progress: f64,
        current: usize,
        total: usize,
        email: String,
    },
    Completed {
        filename: String,
        download_url: String,
    },
    Failed {
        message: String,
    },
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
