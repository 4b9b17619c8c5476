//! Error types for operations, the pipeline engine and workflows
//!
//! Per-host problems are collected into [`HostErrors`] instead of stopping
//! at the first one, so a failed stage reports every failing host.

use cluster_primitives::{RestorePointError, ValidationError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What went wrong for one host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostErrorKind {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("return_code should be 0 but got {0}")]
    ReturnCode(i64),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{op}] host {host}: {kind}")]
pub struct HostError {
    pub op: String,
    pub host: String,
    pub kind: HostErrorKind,
}

/// Every per-host failure of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostErrors(Vec<HostError>);

impl HostErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: HostError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostError> {
        self.0.iter()
    }

    pub fn hosts(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.host.as_str()).collect()
    }

    /// `Ok` when nothing failed
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(OpError::Hosts(self))
        }
    }
}

impl fmt::Display for HostErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for HostErrors {}

impl From<HostError> for HostErrors {
    fn from(error: HostError) -> Self {
        Self(vec![error])
    }
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error("[{op}] {message}")]
    MissingContext { op: String, message: String },

    #[error("[{op}] {message}")]
    Precondition { op: String, message: String },

    #[error("[{op}] fail to marshal request body to JSON: {source}")]
    Serialize {
        op: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Hosts(#[from] HostErrors),

    #[error("stage {op} failed: {source}")]
    Stage {
        op: String,
        #[source]
        source: Box<OpError>,
    },
}

impl OpError {
    /// Name of the pipeline stage that failed, if the engine wrapped it
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            OpError::Stage { op, .. } => Some(op.as_str()),
            _ => None,
        }
    }

    /// The error without the engine's stage wrapper
    pub fn root(&self) -> &OpError {
        match self {
            OpError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Failure building the HTTP transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid TLS material: {0}")]
    Tls(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors returned to callers of the workflow functions
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("fail to resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("fail to find a restore point as specified: {0}")]
    RestorePoint(#[from] RestorePointError),

    #[error("{action}: {source}")]
    Failed {
        action: &'static str,
        #[source]
        source: OpError,
    },
}

impl WorkflowError {
    pub fn failed(action: &'static str) -> impl FnOnce(OpError) -> Self {
        move |source| WorkflowError::Failed { action, source }
    }

    /// Name of the pipeline stage that failed, if any
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            WorkflowError::Failed { source, .. } => source.failed_stage(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OpError>;
