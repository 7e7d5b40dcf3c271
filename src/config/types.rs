// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub health: HealthConfig,
    pub contact: ContactConfig,
    pub geography: GeographyConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Landing site static files
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub root: String,
    pub index_files: Vec<String>,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

fn default_healthz_path() -> String {
    "/healthz".to_string()
}

fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

/// Contact form configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ContactConfig {
    #[serde(default)]
    pub mail: MailConfig,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: u32,
    pub rate_limit_sweep_secs: u64,
    pub send_timeout_secs: u64,
}

/// SMTP relay settings
///
/// Every field except `secure` is required before mail can be sent, but none
/// of them is required to start the server. The port stays a string so a bad
/// value is reported per request instead of aborting startup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MailConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    /// Implicit TLS (port 465 style); otherwise STARTTLS when offered
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Region statistics sources
#[derive(Debug, Deserialize, Clone)]
pub struct GeographyConfig {
    #[serde(default)]
    pub upstream_url: Option<String>,
    #[serde(default)]
    pub upstream_token: Option<String>,
    /// Bearer token for `/api/public/geography/regions`
    #[serde(default)]
    pub public_token: Option<String>,
    #[serde(default)]
    pub mongodb_uri: Option<String>,
    pub mongodb_db: String,
    pub users_collection: String,
    /// Bound on every outbound call (upstream fetch, database query)
    pub timeout_ms: u64,
}
