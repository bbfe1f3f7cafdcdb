use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8732";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_FILE: &str = ".loan-desk/session.json";

/// Distinguishes runtime behavior for different stages of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the dashboard client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("LOAN_DESK_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = validate_base_url(
            &env::var("LOAN_DESK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        )?;

        let timeout_secs = match env::var("LOAN_DESK_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout { value: raw })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let session_file = env::var("LOAN_DESK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let log_level = env::var("LOAN_DESK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            backend: BackendConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            session: SessionConfig { file: session_file },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where the loan service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Replace the base URL after validating it.
    pub fn set_base_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.base_url = validate_base_url(raw)?;
        Ok(())
    }
}

/// Location of the key-value file holding the signed-in user.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub file: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidApiUrl {
        value: trimmed.to_string(),
        source: Some(source),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            value: trimmed.to_string(),
            source: None,
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidApiUrl {
        value: String,
        source: Option<url::ParseError>,
    },
    InvalidTimeout {
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidApiUrl { value, .. } => {
                write!(f, "LOAN_DESK_API_URL must be an http(s) URL, got '{value}'")
            }
            ConfigError::InvalidTimeout { value } => {
                write!(
                    f,
                    "LOAN_DESK_TIMEOUT_SECS must be a positive integer, got '{value}'"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidApiUrl {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}
