//! Inquiry parsing and validation

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use super::ContactError;

/// Upper bound on the message, in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Raw submission as sent by the landing page form
#[derive(Debug, Deserialize, Default)]
pub struct InquiryPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Hidden honeypot field, never filled in by people. Any JSON type is
    /// accepted so a bot sending `true` or a number is still caught.
    #[serde(default)]
    pub company: Option<Value>,
}

impl InquiryPayload {
    /// Parse a request body. Anything but a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, ContactError> {
        serde_json::from_slice(body).map_err(|_| ContactError::MalformedPayload)
    }

    /// True when the honeypot holds anything but null, false, 0 or ""
    pub fn is_honeypot(&self) -> bool {
        self.company.as_ref().is_some_and(is_truthy)
    }
}

/// Who the submitter says they are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Contractor,
    Specialist,
    Operator,
    Unknown,
}

impl Role {
    /// Unrecognized values become `Unknown`
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "contractor" => Self::Contractor,
            "specialist" => Self::Specialist,
            "operator" => Self::Operator,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contractor => "contractor",
            Self::Specialist => "specialist",
            Self::Operator => "operator",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated inquiry, ready to be relayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub message: String,
}

impl Inquiry {
    /// Validate fields in form order: name, email, message
    pub fn validate(payload: &InquiryPayload) -> Result<Self, ContactError> {
        let name = trimmed(payload.name.as_deref());
        let email = trimmed(payload.email.as_deref());
        let message = trimmed(payload.message.as_deref());
        let role = Role::parse(payload.role.as_deref().unwrap_or_default());

        if name.is_empty() {
            return Err(ContactError::MissingName);
        }
        if !is_valid_email(&email) {
            return Err(ContactError::InvalidEmail);
        }
        if message.is_empty() {
            return Err(ContactError::MissingMessage);
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ContactError::MessageTooLong);
        }

        Ok(Self {
            name,
            email,
            role,
            message,
        })
    }

    /// Mail subject line
    pub fn subject(&self) -> String {
        format!("Заявка с сайта ICIA — {} ({})", self.name, self.role)
    }

    /// Plain text mail body listing every field
    pub fn body(&self) -> String {
        [
            format!("Имя: {}", self.name),
            format!("Email: {}", self.email),
            format!("Роль: {}", self.role),
            String::new(),
            "Сообщение:".to_string(),
            self.message.clone(),
        ]
        .join("\n")
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

/// `local@domain.tld` shape check. The address must also be one the mailer
/// can put in a Reply-To header.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
        .is_match(email)
        && email.parse::<lettre::Address>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, email: &str, message: &str) -> InquiryPayload {
        InquiryPayload {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            message: Some(message.to_string()),
            ..InquiryPayload::default()
        }
    }

    #[test]
    fn test_valid_inquiry_is_trimmed() {
        let inquiry = Inquiry::validate(&payload("  Anna ", " a@b.co ", " hi ")).unwrap();
        assert_eq!(inquiry.name, "Anna");
        assert_eq!(inquiry.email, "a@b.co");
        assert_eq!(inquiry.message, "hi");
        assert_eq!(inquiry.role, Role::Unknown);
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.ru"));
        assert!(!is_valid_email("foo@bar"));
        assert!(!is_valid_email("foo.com"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn test_email_must_be_a_mail_address() {
        assert!(!is_valid_email("a(b@c.de"));
        assert!(!is_valid_email("a<b@c.de"));
        let err = Inquiry::validate(&payload("A", "a(b@c.de", "hi")).unwrap_err();
        assert!(matches!(err, ContactError::InvalidEmail));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_invalid_email_rejected() {
        for email in ["foo@bar", "foo.com", ""] {
            let err = Inquiry::validate(&payload("A", email, "hi")).unwrap_err();
            assert!(matches!(err, ContactError::InvalidEmail), "{email}");
        }
    }

    #[test]
    fn test_validation_order() {
        let err = Inquiry::validate(&payload(" ", "bad", "")).unwrap_err();
        assert!(matches!(err, ContactError::MissingName));

        let err = Inquiry::validate(&payload("A", "a@b.co", "   ")).unwrap_err();
        assert!(matches!(err, ContactError::MissingMessage));
    }

    #[test]
    fn test_message_length_counts_characters() {
        let at_limit = "я".repeat(MAX_MESSAGE_CHARS);
        assert!(Inquiry::validate(&payload("A", "a@b.co", &at_limit)).is_ok());

        let over = "я".repeat(MAX_MESSAGE_CHARS + 1);
        let err = Inquiry::validate(&payload("A", "a@b.co", &over)).unwrap_err();
        assert!(matches!(err, ContactError::MessageTooLong));
    }

    #[test]
    fn test_role_coercion() {
        assert_eq!(Role::parse("contractor"), Role::Contractor);
        assert_eq!(Role::parse(" operator "), Role::Operator);
        assert_eq!(Role::parse("specialist"), Role::Specialist);
        assert_eq!(Role::parse("admin"), Role::Unknown);
        assert_eq!(Role::parse(""), Role::Unknown);
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        assert!(matches!(
            InquiryPayload::from_slice(b"[1,2]"),
            Err(ContactError::MalformedPayload)
        ));
        assert!(matches!(
            InquiryPayload::from_slice(b"{not json"),
            Err(ContactError::MalformedPayload)
        ));
        assert!(InquiryPayload::from_slice(b"{}").is_ok());
    }

    #[test]
    fn test_honeypot() {
        let mut p = InquiryPayload::default();
        assert!(!p.is_honeypot());
        p.company = Some(Value::from(""));
        assert!(!p.is_honeypot());
        p.company = Some(Value::from("Acme"));
        assert!(p.is_honeypot());
    }

    #[test]
    fn test_honeypot_accepts_any_json_type() {
        for body in [
            r#"{"company":true}"#,
            r#"{"company":1}"#,
            r#"{"company":[]}"#,
            r#"{"company":{}}"#,
        ] {
            let p = InquiryPayload::from_slice(body.as_bytes()).unwrap();
            assert!(p.is_honeypot(), "{body}");
        }
        for body in [
            r#"{"company":false}"#,
            r#"{"company":0}"#,
            r#"{"company":null}"#,
            r#"{"company":""}"#,
        ] {
            let p = InquiryPayload::from_slice(body.as_bytes()).unwrap();
            assert!(!p.is_honeypot(), "{body}");
        }
    }

    #[test]
    fn test_mail_text() {
        let inquiry = Inquiry {
            name: "A".to_string(),
            email: "a@b.co".to_string(),
            role: Role::Operator,
            message: "hi".to_string(),
        };
        assert_eq!(inquiry.subject(), "Заявка с сайта ICIA — A (operator)");
        let body = inquiry.body();
        assert!(body.starts_with("Имя: A\nEmail: a@b.co\nРоль: operator\n\nСообщение:\n"));
        assert!(body.ends_with("hi"));
    }
}
