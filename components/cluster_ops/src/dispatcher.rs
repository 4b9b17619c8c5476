//! Concurrent per-host request fan-out

use crate::error::HostErrorKind;
use crate::request::HostRequest;
use crate::result::HostResult;
use crate::transport::{Transport, DEFAULT_REQUEST_TIMEOUT};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Issues one request per host concurrently and waits for all of them
///
/// A slow or dead host only delays its own result, up to the request
/// timeout, after which it is reported as a timeout failure.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Send every request and return one result per host, keyed by host
    pub async fn send(
        &self,
        requests: &BTreeMap<String, HostRequest>,
    ) -> BTreeMap<String, HostResult> {
        let calls = requests
            .iter()
            .map(|(host, request)| self.send_one(host, request));

        let results = join_all(calls).await;

        requests.keys().cloned().zip(results).collect()
    }

    async fn send_one(&self, host: &str, request: &HostRequest) -> HostResult {
        let limit = request.timeout.unwrap_or(self.default_timeout);
        debug!(
            "{} {} on {} (timeout {:?})",
            request.method, request.path, host, limit
        );

        match tokio::time::timeout(limit, self.transport.send(host, request)).await {
            Ok(result) => result,
            Err(_) => HostResult::exception(host, HostErrorKind::Timeout(limit)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
