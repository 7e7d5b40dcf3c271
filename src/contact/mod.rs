//! Contact intake
//!
//! Validates landing page inquiries, rate limits them per client and relays
//! each accepted one as a single email.

pub mod inquiry;
pub mod mailer;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use inquiry::{Inquiry, InquiryPayload};
pub use mailer::{MailConfigError, MailError, MailSettings, Mailer, OutgoingMail, SmtpMailer};
use rate_limit::Decision;
pub use rate_limit::RateLimiter;

use crate::logger;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("request body is not a JSON object")]
    MalformedPayload,

    #[error("name is empty")]
    MissingName,

    #[error("email is invalid")]
    InvalidEmail,

    #[error("message is empty")]
    MissingMessage,

    #[error("message is too long")]
    MessageTooLong,

    #[error("mail is not configured: {0}")]
    NotConfigured(#[from] MailConfigError),

    #[error("mail dispatch failed: {0}")]
    Dispatch(#[from] MailError),
}

impl ContactError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::RateLimited => 429,
            Self::MalformedPayload
            | Self::MissingName
            | Self::InvalidEmail
            | Self::MissingMessage
            | Self::MessageTooLong => 400,
            Self::NotConfigured(_) | Self::Dispatch(_) => 500,
        }
    }

    /// Message shown to the visitor. Server-side causes stay in the logs.
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Слишком много запросов. Попробуйте позже.",
            Self::MalformedPayload => "Некорректные данные",
            Self::MissingName => "Введите имя",
            Self::InvalidEmail => "Введите корректный email",
            Self::MissingMessage => "Добавьте сообщение",
            Self::MessageTooLong => "Сообщение слишком длинное",
            Self::NotConfigured(_) | Self::Dispatch(_) => "Ошибка отправки. Попробуйте позже.",
        }
    }
}

/// What happened to an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Honeypot filled in: answered as success, nothing sent
    Discarded,
}

/// Contact intake: rate limit, validation and mail relay
pub struct ContactService {
    limiter: RateLimiter,
    mailer: Result<Arc<dyn Mailer>, MailConfigError>,
}

impl ContactService {
    pub fn new(limiter: RateLimiter, mailer: Result<Arc<dyn Mailer>, MailConfigError>) -> Self {
        Self { limiter, mailer }
    }

    pub const fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn submit(&self, client: &str, body: &[u8]) -> Result<SubmitOutcome, ContactError> {
        self.submit_at(client, body, Instant::now()).await
    }

    pub async fn submit_at(
        &self,
        client: &str,
        body: &[u8],
        now: Instant,
    ) -> Result<SubmitOutcome, ContactError> {
        match self.limiter.check_at(client, now) {
            Decision::Allowed { remaining } => {
                logger::log_debug(&format!("Contact from {client}, {remaining} left in window"));
            }
            Decision::Limited { retry_after } => {
                logger::log_warning(&format!(
                    "Contact rate limit hit for {client}, window resets in {}s",
                    retry_after.as_secs()
                ));
                return Err(ContactError::RateLimited);
            }
        }

        let payload = InquiryPayload::from_slice(body)?;
        if payload.is_honeypot() {
            logger::log_info(&format!("Contact honeypot triggered by {client}, discarding"));
            return Ok(SubmitOutcome::Discarded);
        }

        let inquiry = Inquiry::validate(&payload)?;
        let mailer = self.mailer.as_ref().map_err(Clone::clone)?;

        let mail = OutgoingMail {
            reply_to: inquiry.email.clone(),
            subject: inquiry.subject(),
            body: inquiry.body(),
        };
        mailer.send(&mail).await?;

        logger::log_info(&format!("Contact inquiry relayed (role: {})", inquiry.role));
        Ok(SubmitOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMailer;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_secs(600);

    fn service(mailer: &Arc<RecordingMailer>) -> ContactService {
        let mailer: Arc<dyn Mailer> = mailer.clone();
        ContactService::new(RateLimiter::in_memory(WINDOW, 5), Ok(mailer))
    }

    #[tokio::test]
    async fn test_valid_inquiry_sends_one_mail() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);

        let outcome = svc
            .submit("1.2.3.4", br#"{"name":"A","email":"a@b.co","message":"hi"}"#)
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Sent);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "a@b.co");
        assert_eq!(sent[0].subject, "Заявка с сайта ICIA — A (unknown)");
    }

    #[tokio::test]
    async fn test_honeypot_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);

        let outcome = svc
            .submit(
                "1.2.3.4",
                br#"{"name":"A","email":"a@b.co","message":"hi","company":"Bots Inc"}"#,
            )
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Discarded);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_honeypot_skips_validation() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);
        let outcome = svc.submit("x", br#"{"company":"spam"}"#).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Discarded);
    }

    #[tokio::test]
    async fn test_boolean_honeypot_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);
        let outcome = svc
            .submit(
                "1.2.3.4",
                br#"{"name":"A","email":"a@b.co","message":"hi","company":true}"#,
            )
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Discarded);
        assert!(mailer.sent().is_empty());

        let outcome = svc
            .submit(
                "1.2.3.4",
                br#"{"name":"A","email":"a@b.co","message":"hi","company":false}"#,
            )
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_unparseable_address_is_rejected_before_dispatch() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);
        let err = svc
            .submit("x", br#"{"name":"A","email":"a(b@c.de","message":"hi"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::InvalidEmail));
        assert_eq!(err.status(), 400);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sixth_submission_is_limited_until_window_expires() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);
        let body = br#"{"name":"A","email":"a@b.co","message":"hi"}"#;
        let start = Instant::now();

        for _ in 0..5 {
            svc.submit_at("9.9.9.9", body, start).await.unwrap();
        }
        let err = svc.submit_at("9.9.9.9", body, start).await.unwrap_err();
        assert_eq!(err.status(), 429);

        let later = start + WINDOW;
        assert_eq!(
            svc.submit_at("9.9.9.9", body, later).await.unwrap(),
            SubmitOutcome::Sent
        );
        assert_eq!(mailer.sent().len(), 6);
    }

    #[tokio::test]
    async fn test_missing_mail_config_is_internal_error() {
        let svc = ContactService::new(
            RateLimiter::in_memory(WINDOW, 5),
            Err(MailConfigError::Missing("host")),
        );
        let err = svc
            .submit("x", br#"{"name":"A","email":"a@b.co","message":"hi"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(!err.public_message().contains("host"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_internal_error() {
        let mailer = Arc::new(RecordingMailer::failing());
        let svc = service(&mailer);
        let err = svc
            .submit("x", br#"{"name":"A","email":"a@b.co","message":"hi"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::Dispatch(_)));
        assert_eq!(err.public_message(), "Ошибка отправки. Попробуйте позже.");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&mailer);
        let err = svc.submit("x", b"name=A").await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.public_message(), "Некорректные данные");
    }
}
