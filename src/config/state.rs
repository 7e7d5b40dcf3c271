// Application state module
// Long-lived services shared by every connection

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::contact::{ContactService, MailSettings, Mailer, RateLimiter, SmtpMailer};
use crate::geography::{
    HttpUpstream, MongoRegionStore, RegionResolver, RegionStore, UpstreamSource,
};
use crate::logger;

/// Application state
pub struct AppState {
    pub config: Config,
    pub contact: ContactService,
    pub regions: RegionResolver,
    /// Bearer token guarding the raw region endpoint; unset means always 401
    pub public_token: Option<String>,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    /// Build services from configuration.
    ///
    /// Nothing here fails startup: a missing mail relay or an unreachable
    /// region source is logged and degrades only the affected endpoint.
    pub async fn build(config: Config) -> Self {
        let limiter = RateLimiter::in_memory(
            Duration::from_secs(config.contact.rate_limit_window_secs),
            config.contact.rate_limit_max,
        );

        let send_timeout = Duration::from_secs(config.contact.send_timeout_secs);
        let mailer = MailSettings::from_config(&config.contact.mail)
            .and_then(|settings| SmtpMailer::new(&settings, send_timeout))
            .map(|m| Arc::new(m) as Arc<dyn Mailer>);
        if let Err(ref e) = mailer {
            logger::log_warning(&format!(
                "Contact mail relay unavailable ({e}); submissions will be rejected"
            ));
        }

        let regions = RegionResolver::new(
            Self::build_upstream(&config),
            Self::build_store(&config).await,
        );

        let public_token = config.geography.public_token.clone();
        let contact = ContactService::new(limiter, mailer);
        Self::from_parts(config, contact, regions, public_token)
    }

    /// Assemble state from ready-made services
    pub fn from_parts(
        config: Config,
        contact: ContactService,
        regions: RegionResolver,
        public_token: Option<String>,
    ) -> Self {
        let cached_access_log = Arc::new(AtomicBool::new(config.logging.access_log));
        Self {
            config,
            contact,
            regions,
            public_token,
            cached_access_log,
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }

    fn build_upstream(config: &Config) -> Option<Arc<dyn UpstreamSource>> {
        let url = config.geography.upstream_url.as_deref()?;
        let timeout = Duration::from_millis(config.geography.timeout_ms);
        match HttpUpstream::new(url, config.geography.upstream_token.as_deref(), timeout) {
            Ok(upstream) => Some(Arc::new(upstream)),
            Err(e) => {
                logger::log_error(&format!("Region upstream client setup failed: {e}"));
                None
            }
        }
    }

    async fn build_store(config: &Config) -> Option<Arc<dyn RegionStore>> {
        let uri = config.geography.mongodb_uri.as_deref()?;
        match MongoRegionStore::connect(uri, &config.geography).await {
            Ok(store) => {
                logger::log_info(&format!(
                    "Region store ready (database: {})",
                    config.geography.mongodb_db
                ));
                Some(Arc::new(store))
            }
            Err(e) => {
                logger::log_error(&format!("Region store setup failed: {e}"));
                None
            }
        }
    }
}
