// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use config::builder::DefaultState;
use config::ConfigBuilder;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, GeographyConfig, MailConfig};

/// Deployment environment variables and the config keys they override
const LEGACY_ENV: &[(&str, &str)] = &[
    ("CONTACT_EMAIL_HOST", "contact.mail.host"),
    ("CONTACT_EMAIL_PORT", "contact.mail.port"),
    ("CONTACT_EMAIL_USER", "contact.mail.user"),
    ("CONTACT_EMAIL_PASS", "contact.mail.pass"),
    ("CONTACT_EMAIL_FROM", "contact.mail.from"),
    ("CONTACT_EMAIL_TO", "contact.mail.to"),
    ("GEOGRAPHY_REGIONS_API_URL", "geography.upstream_url"),
    ("GEOGRAPHY_REGIONS_API_TOKEN", "geography.upstream_token"),
    ("MONGODB_URI", "geography.mongodb_uri"),
    ("MONGODB_DB_NAME", "geography.mongodb_db"),
];

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let mut builder = Self::defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SITE").separator("__"));

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, non_empty_env(var))?;
        }

        // Only the literal "true" turns implicit TLS on
        if let Some(secure) = non_empty_env("CONTACT_EMAIL_SECURE") {
            builder = builder.set_override("contact.mail.secure", secure == "true")?;
        }

        // The upstream token doubles as the public endpoint token unless set apart
        if non_empty_env("SITE__GEOGRAPHY__PUBLIC_TOKEN").is_none() {
            builder = builder.set_override_option(
                "geography.public_token",
                non_empty_env("GEOGRAPHY_REGIONS_API_TOKEN"),
            )?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Configuration built from defaults only, ignoring files and environment
    pub fn from_defaults() -> Result<Self, config::ConfigError> {
        Self::defaults()?.build()?.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "icia-site")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 65_536)?
            .set_default("site.root", "static")?
            .set_default("site.index_files", vec!["index.html"])?
            .set_default("contact.rate_limit_window_secs", 600)?
            .set_default("contact.rate_limit_max", 5)?
            .set_default("contact.rate_limit_sweep_secs", 60)?
            .set_default("contact.send_timeout_secs", 10)?
            .set_default("geography.mongodb_db", "ciwork")?
            .set_default("geography.users_collection", "users")?
            .set_default("geography.timeout_ms", 4000)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
