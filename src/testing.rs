//! Test doubles for the external collaborators

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::contact::{MailError, Mailer, OutgoingMail};
use crate::geography::{RegionCount, RegionStore, SourceError, UpstreamSource};

/// Records every mail instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(async move {
            if self.fail {
                let err = "not an address".parse::<lettre::Address>().unwrap_err();
                return Err(MailError::Address(err));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        })
    }
}

/// Upstream returning a fixed payload or a fixed HTTP status
pub enum StaticUpstream {
    Payload(Value),
    Status(u16),
}

impl StaticUpstream {
    pub const fn payload(value: Value) -> Self {
        Self::Payload(value)
    }

    pub const fn status(code: u16) -> Self {
        Self::Status(code)
    }
}

impl UpstreamSource for StaticUpstream {
    fn fetch(&self) -> BoxFuture<'_, Result<Value, SourceError>> {
        Box::pin(async move {
            match self {
                Self::Payload(value) => Ok(value.clone()),
                Self::Status(code) => Err(SourceError::Status(*code)),
            }
        })
    }
}

/// Database returning fixed rows (or failing), counting queries
#[derive(Clone)]
pub struct StaticStore {
    rows: Option<Vec<RegionCount>>,
    calls: Arc<AtomicUsize>,
}

impl StaticStore {
    pub fn rows(rows: Vec<RegionCount>) -> Self {
        Self {
            rows: Some(rows),
            calls: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionStore for StaticStore {
    fn region_counts(&self) -> BoxFuture<'_, Result<Vec<RegionCount>, SourceError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rows
                .clone()
                .ok_or(SourceError::Timeout(std::time::Duration::from_secs(4)))
        })
    }
}
