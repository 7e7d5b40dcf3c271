//! Mail relay for contact inquiries

use futures::future::BoxFuture;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

use crate::config::MailConfig;

/// Mail settings problems, detected once at startup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailConfigError {
    #[error("missing mail setting: {0}")]
    Missing(&'static str),

    #[error("invalid mail setting {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// One outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Anything that can deliver an [`OutgoingMail`]
pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MailError>>;
}

/// Validated SMTP relay settings
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub secure: bool,
    pub from: String,
    pub to: String,
}

impl MailSettings {
    pub fn from_config(cfg: &MailConfig) -> Result<Self, MailConfigError> {
        let port = required("port", cfg.port.as_ref())?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|e| MailConfigError::Invalid("port", e.to_string()))?;

        Ok(Self {
            host: required("host", cfg.host.as_ref())?,
            port,
            user: required("user", cfg.user.as_ref())?,
            pass: required("pass", cfg.pass.as_ref())?,
            secure: cfg.secure,
            from: required("from", cfg.from.as_ref())?,
            to: required("to", cfg.to.as_ref())?,
        })
    }
}

fn required(name: &'static str, value: Option<&String>) -> Result<String, MailConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or(MailConfigError::Missing(name))
}

/// SMTP relay backed by lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, timeout: Duration) -> Result<Self, MailConfigError> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailConfigError::Invalid("from", e.to_string()))?;
        let to = settings
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailConfigError::Invalid("to", e.to_string()))?;

        let tls_params = TlsParameters::new(settings.host.clone())
            .map_err(|e| MailConfigError::Invalid("host", e.to_string()))?;
        // secure: TLS from the first byte; otherwise upgrade when the server offers it
        let tls = if settings.secure {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .tls(tls)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.pass.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, from, to })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let reply_to = mail.reply_to.parse::<Mailbox>()?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .reply_to(reply_to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;
        Ok(message)
    }
}

impl Mailer for SmtpMailer {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(async move {
            let message = self.build_message(mail)?;
            self.transport.send(message).await?;
            Ok(())
        })
    }
}
