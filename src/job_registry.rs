use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Completed { artifact: String },
    Failed { message: String },
}

/// Progress and outcome of one bulk verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Percentage of rows processed, one decimal.
    pub progress: f64,
    /// Number of rows processed so far.
    pub current: usize,
    pub total: usize,
    pub current_email: String,
    pub created_at: DateTime<Utc>,
}

impl Job {
    fn new(id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            progress: 0.0,
            current: 0,
            total: 0,
            current_email: String::new(),
            created_at,
        }
    }
}

type JobRecord = Arc<Mutex<Job>>;

fn lock(record: &Mutex<Job>) -> MutexGuard<'_, Job> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide table of bulk jobs, keyed by job id.
///
/// The key set sits behind a single `RwLock`; each record has its own lock
/// so a worker writing progress never blocks lookups of other jobs.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new running job and returns the handle its worker writes through.
    pub fn create(&self, now: DateTime<Utc>) -> JobHandle {
        let id = Uuid::new_v4().to_string();
        let record = Arc::new(Mutex::new(Job::new(id.clone(), now)));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), record.clone());

        tracing::info!(job_id = %id, "bulk job created");
        JobHandle { id, record }
    }

    /// Snapshot of the job, if it is still tracked.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        let record = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()?;
        let job = lock(&record).clone();
        Some(job)
    }

    /// Drops every job created more than `ttl` before `now`, whatever its status.
    ///
    /// Returns the number of jobs removed.
    pub fn evict_stale(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, record| {
            let created_at = lock(record).created_at;
            now.signed_duration_since(created_at) <= ttl
        });
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::info!(removed, remaining = jobs.len(), "evicted stale jobs");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access to one job, held by the worker that drives it.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: String,
    record: JobRecord,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records that `processed` of `total` rows are done, the last being `email`.
    ///
    /// Progress never moves backwards: a stale update is ignored.
    pub fn record_progress(&self, processed: usize, total: usize, email: &str) {
        let mut job = lock(&self.record);
        if job.status != JobStatus::Running || processed < job.current {
            return;
        }
        job.progress = percentage(processed, total);
        job.current = processed;
        job.total = total;
        job.current_email = email.to_string();
    }

    pub fn complete(&self, artifact: String) {
        let mut job = lock(&self.record);
        job.progress = 100.0;
        job.current = job.total;
        job.status = JobStatus::Completed { artifact };
    }

    pub fn fail(&self, message: String) {
        lock(&self.record).status = JobStatus::Failed { message };
    }

    pub fn snapshot(&self) -> Job {
        lock(&self.record).clone()
    }
}

/// `processed / total * 100`, rounded to one decimal. An empty job is complete.
pub fn percentage(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = processed as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
