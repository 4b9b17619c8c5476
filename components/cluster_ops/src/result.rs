//! Outcome of one request to one host

use crate::error::HostErrorKind;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// The host answered with a 2xx status
    Success,
    /// The host answered with any other status
    Failure,
    /// The host never answered (connection error, timeout)
    Exception,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    pub host: String,
    pub status: ResultStatus,
    pub status_code: Option<u16>,
    pub content: String,
    pub err: Option<HostErrorKind>,
}

const UNAUTHORIZED: u16 = 401;

impl HostResult {
    pub fn success(host: impl Into<String>, status_code: u16, content: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: ResultStatus::Success,
            status_code: Some(status_code),
            content: content.into(),
            err: None,
        }
    }

    pub fn failure(host: impl Into<String>, status_code: u16, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            host: host.into(),
            status: ResultStatus::Failure,
            status_code: Some(status_code),
            err: Some(HostErrorKind::Status {
                status: status_code,
                body: content.clone(),
            }),
            content,
        }
    }

    pub fn exception(host: impl Into<String>, kind: HostErrorKind) -> Self {
        Self {
            host: host.into(),
            status: ResultStatus::Exception,
            status_code: None,
            content: String::new(),
            err: Some(kind),
        }
    }

    pub fn is_passing(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code == Some(UNAUTHORIZED)
    }

    /// Nothing came back from the host at all
    pub fn is_unreachable(&self) -> bool {
        self.status == ResultStatus::Exception
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.err, Some(HostErrorKind::Timeout(_)))
    }

    /// The failure for this host, or a generic one if none was recorded
    pub fn error_kind(&self) -> HostErrorKind {
        self.err.clone().unwrap_or_else(|| {
            HostErrorKind::Rejected(format!("unexpected result status {:?}", self.status))
        })
    }

    /// Decode the body against an operation's response schema
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HostErrorKind> {
        serde_json::from_str(&self.content).map_err(|e| HostErrorKind::Decode(e.to_string()))
    }
}
