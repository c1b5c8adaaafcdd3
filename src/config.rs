//! Configuration management for the voice playground.
//!
//! Configuration can be set via environment variables:
//! - `PLAYGROUND_PAGE_URL` - Required. Page URL whose query string carries the identity parameters.
//! - `TOKEN_ENDPOINT` - Optional. Token-issuing endpoint. Defaults to `http://127.0.0.1:3000/api/token`.
//! - `CONTEXT_API_BASE` - Optional. Health-tracking API base. Defaults to `https://apiv7.goqii.com/`.
//! - `HOST` - Optional. Control API host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Control API port. Defaults to `3030`.
//! - `CONFIG_DEBOUNCE_MS` - Optional. Live config push debounce. Defaults to `500`. Read by
//!   `SessionBridge::from_config` in hosts that provide a realtime transport.
//! - `HTTP_TIMEOUT_SECS` - Optional. Timeout for outbound requests. Defaults to `30`.
//! - `INSTRUCTIONS_FILE` - Optional. File holding the base agent instructions.
//! - `AUTO_CONNECT` - Optional. Connect once at startup. Defaults to `true`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::util::env_var_bool;

pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://127.0.0.1:3000/api/token";
pub const DEFAULT_CONTEXT_API_BASE: &str = "https://apiv7.goqii.com/";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page URL the identity parameters are read from
    pub page_url: Url,

    /// Token-issuing endpoint
    pub token_endpoint: Url,

    /// Base URL of the remote health-tracking API
    pub context_api_base: Url,

    /// Control API host
    pub host: String,

    /// Control API port
    pub port: u16,

    /// Quiet period before a live configuration push (used by `SessionBridge::from_config`)
    pub config_debounce: Duration,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,

    /// Optional file overriding the built-in base instructions
    pub instructions_file: Option<PathBuf>,

    /// Whether to connect once at startup
    pub auto_connect: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `PLAYGROUND_PAGE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let page_url = std::env::var("PLAYGROUND_PAGE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PLAYGROUND_PAGE_URL".to_string()))?;
        let page_url = parse_url("PLAYGROUND_PAGE_URL", &page_url)?;

        let token_endpoint = std::env::var("TOKEN_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_TOKEN_ENDPOINT.to_string());
        let token_endpoint = parse_url("TOKEN_ENDPOINT", &token_endpoint)?;

        let context_api_base = std::env::var("CONTEXT_API_BASE")
            .unwrap_or_else(|_| DEFAULT_CONTEXT_API_BASE.to_string());
        let context_api_base = parse_url("CONTEXT_API_BASE", &context_api_base)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3030".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let debounce_ms: u64 = std::env::var("CONFIG_DEBOUNCE_MS")
            .unwrap_or_else(|_| DEFAULT_DEBOUNCE_MS.to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("CONFIG_DEBOUNCE_MS".to_string(), format!("{}", e))
            })?;

        let timeout_secs: u64 = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        let instructions_file = std::env::var("INSTRUCTIONS_FILE").ok().map(PathBuf::from);

        Ok(Self {
            page_url,
            token_endpoint,
            context_api_base,
            host,
            port,
            config_debounce: Duration::from_millis(debounce_ms),
            http_timeout: Duration::from_secs(timeout_secs),
            instructions_file,
            auto_connect: env_var_bool("AUTO_CONNECT", true),
        })
    }

    /// Create a config with default values for everything but the page URL (useful for testing).
    pub fn new(page_url: Url) -> Self {
        Self {
            page_url,
            token_endpoint: Url::parse(DEFAULT_TOKEN_ENDPOINT).expect("valid default endpoint"),
            context_api_base: Url::parse(DEFAULT_CONTEXT_API_BASE).expect("valid default base"),
            host: "127.0.0.1".to_string(),
            port: 3030,
            config_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            http_timeout: Duration::from_secs(30),
            instructions_file: None,
            auto_connect: true,
        }
    }

    /// Read the base instructions from `instructions_file`, if one is configured.
    pub fn load_instructions(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.instructions_file else {
            return Ok(None);
        };
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidValue("INSTRUCTIONS_FILE".to_string(), format!("{}", e))
        })?;
        Ok(Some(contents))
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
}
