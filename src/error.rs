use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Failure to turn an uploaded file into address rows.
///
/// Messages are shown to API clients, so they never carry server paths.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("File type not allowed. Please upload CSV, Excel or TXT files only.")]
    UnsupportedExtension { filename: String },
    #[error("Error reading file: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Error reading file: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("Error reading file: workbook has no sheets")]
    NoSheets { path: PathBuf },
}

/// Failure to persist a result artifact. A job that hits this is marked failed.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Error saving results: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error saving results: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Errors raised inside a single SMTP dialogue.
///
/// These never leave the probe: every variant is reported as an `Unknown` verdict.
#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("timed out during {stage}")]
    Timeout { stage: &'static str },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{stage} rejected with {code}")]
    Rejected { stage: &'static str, code: u16 },
}
