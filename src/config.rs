use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime settings for the verification service.
///
/// Loaded from the process environment, after an optional `.env` file has
/// been applied by `dotenv`. Every key has a default, so an empty
/// environment yields a working local setup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub results_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub job_ttl: Duration,
    pub max_upload_bytes: usize,
    pub dns_timeout: Duration,
    pub helo_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            results_dir: PathBuf::from("Results"),
            upload_dir: env::temp_dir(),
            job_ttl: Duration::from_secs(3600),
            max_upload_bytes: 16 * 1024 * 1024,
            dns_timeout: Duration::from_secs(5),
            helo_name: "localhost".to_string(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing or blank keys fall back to [`AppConfig::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parse_or(&get, "PORT", defaults.port)?,
            results_dir: get("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            job_ttl: Duration::from_secs(parse_or(
                &get,
                "JOB_TTL_SECS",
                defaults.job_ttl.as_secs(),
            )?),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            dns_timeout: Duration::from_secs(parse_or(
                &get,
                "DNS_TIMEOUT_SECS",
                defaults.dns_timeout.as_secs(),
            )?),
            helo_name: get("SMTP_HELO_NAME").unwrap_or(defaults.helo_name),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}
