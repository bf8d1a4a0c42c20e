//! Configuration management for BRACU Loop services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<APP_ENV>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Student and admin session configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Email relay configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply embedded migrations at start-up
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 secret for student session tokens
    pub jwt_secret: Option<String>,

    /// Student session lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Only identities under this email domain may sign in
    #[serde(default = "default_allowed_domain")]
    pub allowed_domain: String,

    /// Admin session lifetime in seconds
    #[serde(default = "default_admin_session_ttl")]
    pub admin_session_ttl_secs: u64,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    /// Admin account created at start-up when missing
    pub bootstrap_admin_username: Option<String>,

    pub bootstrap_admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// HTTP relay endpoint; when absent, mail falls back to a mailto link
    pub relay_url: Option<String>,

    /// Relay service identifier
    pub service_id: Option<String>,

    /// Template used for admin notifications
    pub admin_template_id: Option<String>,

    /// Template used for replies to students
    pub reply_template_id: Option<String>,

    /// Relay public key
    pub public_key: Option<String>,

    /// Addresses notified about new contact messages
    #[serde(default = "default_admin_recipients")]
    pub admin_recipients: Vec<String>,

    /// Name used in subjects and signatures
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Public site URL linked from emails
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Relay request timeout in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,

    /// Maximum total time spent retrying one message
    #[serde(default = "default_mail_retry_window")]
    pub max_retry_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the object buckets
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Bucket for student notes
    #[serde(default = "default_notes_bucket")]
    pub notes_bucket: String,

    /// Bucket for question papers
    #[serde(default = "default_questions_bucket")]
    pub questions_bucket: String,

    /// Largest accepted note archive in bytes
    #[serde(default = "default_max_note_bytes")]
    pub max_note_bytes: usize,

    /// Largest accepted question paper in bytes
    #[serde(default = "default_max_question_bytes")]
    pub max_question_bytes: usize,

    /// Base URL under which stored objects are served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second across the API
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_jwt_expiration() -> u64 { 7 * 24 * 3600 }
fn default_allowed_domain() -> String { crate::DEFAULT_ALLOWED_DOMAIN.to_string() }
fn default_admin_session_ttl() -> u64 { 24 * 3600 }
fn default_request_id_header() -> String { "X-Request-ID".to_string() }
fn default_admin_recipients() -> Vec<String> { vec!["admin@braculoop.app".to_string()] }
fn default_app_name() -> String { crate::APP_NAME.to_string() }
fn default_app_url() -> String { "https://braculoop.app".to_string() }
fn default_mail_timeout() -> u64 { 10 }
fn default_mail_retry_window() -> u64 { 30 }
fn default_storage_root() -> String { "./data/objects".to_string() }
fn default_notes_bucket() -> String { "student-notes".to_string() }
fn default_questions_bucket() -> String { "question-papers".to_string() }
fn default_max_note_bytes() -> usize { 18 * 1024 * 1024 }
fn default_max_question_bytes() -> usize { 10 * 1024 * 1024 }
fn default_public_base_url() -> String { "/v1/objects".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "bracu-loop".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("mail.admin_recipients")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Admin session lifetime as a chrono duration
    pub fn admin_session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auth.admin_session_ttl_secs as i64)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
            allowed_domain: default_allowed_domain(),
            admin_session_ttl_secs: default_admin_session_ttl(),
            request_id_header: default_request_id_header(),
            bootstrap_admin_username: None,
            bootstrap_admin_password: None,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            service_id: None,
            admin_template_id: None,
            reply_template_id: None,
            public_key: None,
            admin_recipients: default_admin_recipients(),
            app_name: default_app_name(),
            app_url: default_app_url(),
            timeout_secs: default_mail_timeout(),
            max_retry_secs: default_mail_retry_window(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            notes_bucket: default_notes_bucket(),
            questions_bucket: default_questions_bucket(),
            max_note_bytes: default_max_note_bytes(),
            max_question_bytes: default_max_question_bytes(),
            public_base_url: default_public_base_url(),
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
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/bracu_loop".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                run_migrations: default_enabled(),
            },
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
