//! Flat key/value configuration, grouped the way the source system groups it:
//! `imap.*`, `azure.*`, `openai.*`, `google.*`, `postgres.*`. Missing required
//! values are a fatal startup error — the process has no sensible degraded
//! mode without credentials for the mailbox, the store, or the oracle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    MissingVar(&'static str),
    #[error("environment variable `{0}` has an invalid value: {1}")]
    InvalidVar(&'static str, String),
}

/// Azure AD application credentials for the Graph-backed mailbox.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub client_id: String,
    pub client_secret_value: String,
    pub tenant_id: String,
    pub user_id: String,
}

/// Legacy IMAP credentials, kept for parity with the source system's
/// configuration groups even though the default adapter is Graph-based.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub imap: ImapConfig,
    pub azure: AzureConfig,
    pub oracle: OracleConfig,
    pub geocoder: GeocoderConfig,
    pub database_url: String,
    /// Width `N` of the Extraction Consumer Pool's semaphore (§4.4).
    pub extraction_workers: usize,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok()
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let extraction_workers = match optional("EXTRACTION_WORKERS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidVar("EXTRACTION_WORKERS", raw))?,
            None => 6,
        };

        Ok(Self {
            imap: ImapConfig {
                email: optional("IMAP_EMAIL"),
                password: optional("IMAP_PW"),
            },
            azure: AzureConfig {
                client_id: required("AZURE_CLIENT_ID")?,
                client_secret_value: required("AZURE_CLIENT_SECRET_VALUE")?,
                tenant_id: required("AZURE_TENANT_ID")?,
                user_id: required("AZURE_USER_ID")?,
            },
            oracle: OracleConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo-1106".to_string()),
            },
            geocoder: GeocoderConfig {
                api_key: required("GOOGLE_API_KEY")?,
                base_url: optional("GOOGLE_GEOCODE_BASE_URL")
                    .unwrap_or_else(|| "https://maps.googleapis.com/maps/api/geocode/json".to_string()),
            },
            database_url: required("DATABASE_URL")?,
            extraction_workers,
        })
    }
}
