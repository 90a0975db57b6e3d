//! Environment-variable configuration for the server binary.
//!
//! All knobs live under the `VIGIL_` prefix. Durations are given in
//! milliseconds; a value of `0` disables the corresponding deadline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::server::tls::TlsVersion;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: invalid port {value:?}")]
    InvalidPort { key: &'static str, value: String },
    #[error("{key}: invalid duration {value:?} (milliseconds expected)")]
    InvalidDuration { key: &'static str, value: String },
    #[error("{key}: value is required")]
    MissingValue { key: &'static str },
    #[error("{key}: file does not exist: {path}")]
    FileNotFound { key: &'static str, path: String },
    #[error("{key}: invalid value {value:?} (allowed: 1.2, 1.3)")]
    InvalidTlsVersion { key: &'static str, value: String },
}

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub shutdown_deadline: Duration,
    pub request_timeout: Duration,
    pub tls_cert_file: PathBuf,
    pub tls_key_file: PathBuf,
    pub tls_min_version: TlsVersion,
}

impl Config {
    /// Loads configuration from `VIGIL_*` environment variables, applying
    /// defaults where unset and validating everything else.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port("VIGIL_PORT", DEFAULT_PORT)?;
        let read_timeout = parse_duration_ms("VIGIL_READ_TIMEOUT_MS", DEFAULT_READ_TIMEOUT)?;
        let write_timeout = parse_duration_ms("VIGIL_WRITE_TIMEOUT_MS", DEFAULT_WRITE_TIMEOUT)?;
        let shutdown_deadline =
            parse_duration_ms("VIGIL_SHUTDOWN_DEADLINE_MS", DEFAULT_SHUTDOWN_DEADLINE)?;
        let request_timeout =
            parse_duration_ms("VIGIL_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT)?;
        let tls_cert_file = parse_required_file("VIGIL_TLS_CERT_FILE")?;
        let tls_key_file = parse_required_file("VIGIL_TLS_KEY_FILE")?;
        let tls_min_version = parse_tls_min_version("VIGIL_TLS_MIN_VERSION", TlsVersion::Tls13)?;

        Ok(Self {
            listen_addr: format!("0.0.0.0:{}", port),
            read_timeout: non_zero(read_timeout),
            write_timeout: non_zero(write_timeout),
            shutdown_deadline,
            request_timeout,
            tls_cert_file,
            tls_key_file,
            tls_min_version,
        })
    }
}

fn env_value(key: &'static str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_port(key: &'static str, fallback: u16) -> Result<u16, ConfigError> {
    let Some(raw) = env_value(key) else {
        return Ok(fallback);
    };

    let trimmed = raw.trim_start_matches(':');
    match trimmed.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(ConfigError::InvalidPort { key, value: raw }),
    }
}

fn parse_duration_ms(key: &'static str, fallback: Duration) -> Result<Duration, ConfigError> {
    let Some(raw) = env_value(key) else {
        return Ok(fallback);
    };

    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidDuration { key, value: raw })
}

fn parse_required_file(key: &'static str) -> Result<PathBuf, ConfigError> {
    let Some(raw) = env_value(key) else {
        return Err(ConfigError::MissingValue { key });
    };

    let path = PathBuf::from(&raw);
    if !path.exists() {
        return Err(ConfigError::FileNotFound { key, path: raw });
    }
    Ok(path)
}

fn parse_tls_min_version(
    key: &'static str,
    fallback: TlsVersion,
) -> Result<TlsVersion, ConfigError> {
    let Some(raw) = env_value(key) else {
        return Ok(fallback);
    };

    TlsVersion::parse(&raw).ok_or(ConfigError::InvalidTlsVersion { key, value: raw })
}

fn non_zero(duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}
