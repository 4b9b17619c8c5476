//! The operation contract: prepare, execute, finalize

use crate::context::ExecContext;
use crate::error::{HostError, HostErrorKind, HostErrors, OpError, Result};
use crate::request::HostRequest;
use crate::result::HostResult;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Bookkeeping every operation carries: identity, target hosts and the
/// per-host request and result buffers of the current run
#[derive(Debug, Clone)]
pub struct OpBase {
    name: &'static str,
    description: String,
    hosts: Vec<String>,
    requests: BTreeMap<String, HostRequest>,
    results: BTreeMap<String, HostResult>,
}

impl OpBase {
    pub fn new(name: &'static str, description: impl Into<String>, hosts: Vec<String>) -> Self {
        Self {
            name,
            description: description.into(),
            hosts,
            requests: BTreeMap::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn set_hosts(&mut self, hosts: Vec<String>) {
        self.hosts = hosts;
    }

    pub fn requests(&self) -> &BTreeMap<String, HostRequest> {
        &self.requests
    }

    pub fn results(&self) -> &BTreeMap<String, HostResult> {
        &self.results
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    pub fn set_request(&mut self, host: impl Into<String>, request: HostRequest) {
        self.requests.insert(host.into(), request);
    }

    /// Same request for every target host
    pub fn set_request_for_all(&mut self, request: HostRequest) {
        self.requests = self
            .hosts
            .iter()
            .map(|host| (host.clone(), request.clone()))
            .collect();
    }

    pub fn json_request<T: Serialize>(&self, request: HostRequest, body: &T) -> Result<HostRequest> {
        request
            .with_json_body(body)
            .map_err(|source| OpError::Serialize {
                op: self.name.to_string(),
                source,
            })
    }

    pub fn missing_context(&self, message: impl Into<String>) -> OpError {
        OpError::MissingContext {
            op: self.name.to_string(),
            message: message.into(),
        }
    }

    pub fn precondition(&self, message: impl Into<String>) -> OpError {
        OpError::Precondition {
            op: self.name.to_string(),
            message: message.into(),
        }
    }

    pub fn host_error(&self, host: &str, kind: HostErrorKind) -> HostError {
        HostError {
            op: self.name.to_string(),
            host: host.to_string(),
            kind,
        }
    }

    /// Hand the request buffer to the dispatcher and keep the results
    pub async fn run_execute(&mut self, ctx: &ExecContext) {
        self.results = ctx.dispatcher().send(&self.requests).await;
    }

    pub fn log_response(&self, host: &str, result: &HostResult) {
        if result.is_passing() {
            debug!(
                "[{}] {} -> {:?}: {}",
                self.name, host, result.status_code, result.content
            );
        } else {
            warn!(
                "[{}] {} failed: {}",
                self.name,
                host,
                result.error_kind()
            );
        }
    }

    /// Walk results in host order, handing passing ones to `check`
    ///
    /// Every failure, transport or application level, is collected; none
    /// short-circuits the walk.
    pub fn collect_results<F>(&self, mut check: F) -> Result<()>
    where
        F: FnMut(&str, &HostResult) -> std::result::Result<(), HostErrorKind>,
    {
        let mut errors = HostErrors::new();

        for (host, result) in &self.results {
            self.log_response(host, result);

            let outcome = if result.is_passing() {
                check(host, result)
            } else {
                Err(result.error_kind())
            };

            if let Err(kind) = outcome {
                errors.push(self.host_error(host, kind));
            }
        }

        errors.into_result()
    }
}

/// Common response shape: a zero return code means success
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ReturnCodeResponse {
    #[serde(default)]
    pub return_code: i64,
}

pub fn check_return_code(return_code: i64) -> std::result::Result<(), HostErrorKind> {
    if return_code == 0 {
        Ok(())
    } else {
        Err(HostErrorKind::ReturnCode(return_code))
    }
}

/// One pipeline stage
///
/// The engine calls `prepare`, `execute` and `finalize` in order. Only
/// `prepare` may build requests, only `execute` talks to hosts.
pub trait ClusterOp: Send {
    fn base(&self) -> &OpBase;

    fn base_mut(&mut self) -> &mut OpBase;

    fn name(&self) -> &'static str {
        self.base().name()
    }

    fn description(&self) -> &str {
        self.base().description()
    }

    /// Build the per-host request buffer from the current context
    fn prepare(&mut self, ctx: &mut ExecContext) -> Result<()>;

    fn execute<'a>(&'a mut self, ctx: &'a mut ExecContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.base_mut().run_execute(ctx).await;
            self.process_result(ctx)
        })
    }

    /// Interpret the results of `execute`
    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()>;

    fn finalize(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        Ok(())
    }
}

/// Instruction list for one engine run
pub type Instructions = Vec<Box<dyn ClusterOp>>;
