use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::input::{self, RawEntry};
use crate::job_registry::JobHandle;
use crate::models::Verdict;
use crate::results::ResultStore;
use crate::validation::EmailVerifier;

/// Drives one bulk job: verifies every row in order, publishes progress
/// through the job handle, then writes the result artifact.
#[derive(Clone)]
pub struct BulkJobRunner {
    verifier: EmailVerifier,
    store: ResultStore,
}

impl BulkJobRunner {
    pub fn new(verifier: EmailVerifier, store: ResultStore) -> Self {
        Self { verifier, store }
    }

    /// Starts the job in the background. Completion is only observable
    /// through the job record.
    pub fn spawn(&self, upload: PathBuf, job: JobHandle) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_upload(upload, job).await })
    }

    /// Reads the uploaded file, removes it, and processes its rows.
    pub async fn run_upload(&self, upload: PathBuf, job: JobHandle) {
        let path = upload.clone();
        let read = tokio::task::spawn_blocking(move || input::read_rows(&path)).await;

        if let Err(err) = tokio::fs::remove_file(&upload).await {
            tracing::debug!(path = %upload.display(), error = %err, "upload not removed");
        }

        match read {
            Ok(Ok(rows)) => self.run(rows, job).await,
            Ok(Err(err)) => {
                tracing::warn!(
                    job_id = job.id(),
                    path = %upload.display(),
                    error = %err,
                    "bulk job input unreadable"
                );
                job.fail(err.to_string());
            }
            Err(err) => {
                tracing::error!(job_id = job.id(), error = %err, "input reader task failed");
                job.fail(format!("Error reading file: {err}"));
            }
        }
    }

    /// Processes already-parsed rows and finishes the job.
    pub async fn run(&self, rows: Vec<RawEntry>, job: JobHandle) {
        tracing::info!(job_id = job.id(), total = rows.len(), "bulk job started");
        let results = self.process_rows(&rows, &job).await;

        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.write(&results)).await {
            Ok(Ok(artifact)) => {
                tracing::info!(job_id = job.id(), %artifact, "bulk job completed");
                job.complete(artifact);
            }
            Ok(Err(err)) => {
                tracing::error!(
                    job_id = job.id(),
                    results_dir = %self.store.dir().display(),
                    error = %err,
                    "bulk job failed"
                );
                job.fail(err.to_string());
            }
            Err(err) => {
                tracing::error!(job_id = job.id(), error = %err, "artifact writer task failed");
                job.fail(format!("Error saving results: {err}"));
            }
        }
    }

    async fn process_rows(&self, rows: &[RawEntry], job: &JobHandle) -> Vec<(String, Verdict)> {
        let total = rows.len();
        let mut results = Vec::with_capacity(total);

        for (index, entry) in rows.iter().enumerate() {
            let (email, verdict) = self.verify_entry(entry).await;
            results.push((entry.original().to_string(), verdict));
            job.record_progress(index + 1, total, email);
        }

        results
    }

    /// Verdict for one row, with the trimmed address it was computed for.
    async fn verify_entry<'a>(&self, entry: &'a RawEntry) -> (&'a str, Verdict) {
        let text = match entry {
            RawEntry::Missing => return ("", Verdict::Empty),
            RawEntry::Malformed(text) => return (text.trim(), Verdict::Error),
            RawEntry::Value(text) => text.trim(),
        };
        if text.is_empty() {
            return (text, Verdict::Empty);
        }

        match AssertUnwindSafe(self.verifier.verify(text))
            .catch_unwind()
            .await
        {
            Ok(verdict) => (text, verdict),
            Err(_) => {
                tracing::warn!(email = text, "verification panicked; row recorded as error");
                (text, Verdict::Error)
            }
        }
    }
}
