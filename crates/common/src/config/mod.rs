//! Configuration management for Cognify services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Generative AI service configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Content acquisition (URL fetch, uploads)
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting for AI-backed endpoints
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// In-memory assessment attempts
    #[serde(default)]
    pub attempts: AttemptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Which [`DocumentStore`](crate::store::DocumentStore) backs the service
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Database URL (required for the postgres backend)
    pub url: Option<String>,

    /// Read replica URL (optional)
    pub read_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply bundled SQL migrations on startup
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// AI provider: gemini
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    pub api_key: Option<String>,

    /// API base URL (for proxies and tests)
    #[serde(default = "default_ai_base")]
    pub api_base: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Reject generated assessments whose question count or types differ
    /// from the request
    #[serde(default = "default_enabled")]
    pub enforce_question_count: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    /// URL fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,

    /// Run the outline classifier on every new material
    #[serde(default)]
    pub detect_outlines: bool,

    /// Upper bound for acquiring one uploaded file (OCR plus outline
    /// expansion), in seconds
    #[serde(default = "default_file_timeout")]
    pub file_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: Option<String>,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttemptConfig {
    /// Untimed attempts with no activity for this long are discarded
    #[serde(default = "default_attempt_idle")]
    pub idle_timeout_secs: u64,

    /// How long a finished attempt's outcome stays readable
    #[serde(default = "default_attempt_retention")]
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// AI-backed requests per second (whole service)
    #[serde(default = "default_rate_limit")]
    pub ai_requests_per_second: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 180 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_backend() -> StoreBackend { StoreBackend::Postgres }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_ai_provider() -> String { "gemini".to_string() }
fn default_ai_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_ai_model() -> String { "gemini-2.5-flash".to_string() }
fn default_ai_timeout() -> u64 { 120 }
fn default_fetch_timeout() -> u64 { 20 }
fn default_user_agent() -> String { format!("cognify/{}", crate::VERSION) }
fn default_max_upload() -> usize { 15 * 1024 * 1024 }
fn default_file_timeout() -> u64 { 300 }
fn default_attempt_idle() -> u64 { 4 * 3600 }
fn default_attempt_retention() -> u64 { 15 * 60 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "cognify".to_string() }
fn default_rate_limit() -> u32 { 2 }
fn default_burst() -> u32 { 5 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__AI__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url is required when database.backend = \"postgres\"".to_string(),
            ));
        }

        match self.ai.provider.as_str() {
            "gemini" => {
                if self.ai.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Message(
                        "ai.api_key is required for the gemini provider".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Message(format!(
                    "Unknown ai.provider '{}'. Must be gemini.",
                    other
                )))
            }
        }

        if self.auth.jwt_secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Message(
                "auth.jwt_secret is required".to_string(),
            ));
        }

        if self.acquisition.file_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "acquisition.file_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.ai_requests_per_second == 0 || self.rate_limit.burst == 0)
        {
            return Err(ConfigError::Message(
                "rate_limit.ai_requests_per_second and rate_limit.burst must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_enabled(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            api_key: None,
            api_base: default_ai_base(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
            enforce_question_count: default_enabled(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_upload_bytes: default_max_upload(),
            detect_outlines: false,
            file_timeout_secs: default_file_timeout(),
        }
    }
}

impl AcquisitionConfig {
    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_attempt_idle(),
            retention_secs: default_attempt_retention(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ai_requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            ai: AiConfig::default(),
            acquisition: AcquisitionConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            attempts: AttemptConfig::default(),
        }
    }
}
