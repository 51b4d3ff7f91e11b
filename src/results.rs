use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use uuid::Uuid;

use crate::error::ArtifactError;
use crate::models::Verdict;

pub const ARTIFACT_PREFIX: &str = "Validated_emails_";
pub const ARTIFACT_EXTENSION: &str = ".csv";
pub const ARTIFACT_HEADER: [&str; 2] = ["Emails", "Validation Results"];

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Validated_emails_\d{8}_\d{6}(_[0-9a-f]{8})?\.csv$")
        .expect("artifact name pattern is a valid regex")
});

/// Whether `name` is a result artifact name that may be served.
///
/// Only `Validated_emails_<YYYYmmdd>_<HHMMSS>[_<8 hex>].csv` passes, which
/// rules out path separators and any other file in the results directory.
pub fn is_artifact_name(name: &str) -> bool {
    ARTIFACT_NAME.is_match(name)
}

/// Directory that holds completed result artifacts.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the `(original address, verdict)` rows and returns the artifact name.
    ///
    /// Rows go to a `.partial` sibling that is renamed into place once fully
    /// written, so a failed write leaves no artifact behind.
    pub fn write(&self, rows: &[(String, Verdict)]) -> Result<String, ArtifactError> {
        let name = artifact_name();
        let path = self.dir.join(&name);
        let partial = self.dir.join(format!("{name}.partial"));

        if let Err(err) = write_csv(&partial, rows) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        if let Err(source) = fs::rename(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(ArtifactError::Io { path, source });
        }

        tracing::info!(artifact = %name, rows = rows.len(), "result artifact written");
        Ok(name)
    }

    /// Resolves a servable artifact to its path. `None` for rejected or absent names.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if !is_artifact_name(name) {
            return None;
        }
        let path = self.dir.join(name);
        path.is_file().then_some(path)
    }
}

fn artifact_name() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{ARTIFACT_PREFIX}{timestamp}_{}{ARTIFACT_EXTENSION}", &suffix[..8])
}

fn write_csv(path: &Path, rows: &[(String, Verdict)]) -> Result<(), ArtifactError> {
    let csv_err = |source: csv::Error| ArtifactError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(ARTIFACT_HEADER).map_err(csv_err)?;
    for (email, verdict) in rows {
        writer
            .write_record([email.as_str(), verdict.label()])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}
