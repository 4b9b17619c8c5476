//! Scripted transport for exercising operations and workflows offline

use crate::context::ExecContext;
use crate::dispatcher::Dispatcher;
use crate::error::{HostErrorKind, Result};
use crate::op::ClusterOp;
use crate::request::{HostRequest, HttpMethod};
use crate::result::HostResult;
use crate::transport::Transport;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(u16, String),
    Unreachable,
    Hang,
    Delay(Duration),
}

impl Reply {
    pub(crate) fn json(body: impl Into<String>) -> Self {
        Reply::Body(200, body.into())
    }

    pub(crate) fn status(code: u16, body: impl Into<String>) -> Self {
        Reply::Body(code, body.into())
    }
}

#[derive(Debug, Clone)]
struct Route {
    host: Option<String>,
    path: String,
    reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub host: String,
    pub method: HttpMethod,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
    pub authenticated: bool,
}

impl RecordedCall {
    pub(crate) fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(self.body.as_deref().unwrap_or("null")).unwrap()
    }
}

/// Routes are matched host-specific first and the latest registration
/// wins; unknown routes are unreachable
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, path: &str, reply: Reply) -> Self {
        self.routes.push(Route {
            host: None,
            path: path.to_string(),
            reply,
        });
        self
    }

    pub(crate) fn on_host(mut self, host: &str, path: &str, reply: Reply) -> Self {
        self.routes.push(Route {
            host: Some(host.to_string()),
            path: path.to_string(),
            reply,
        });
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    /// Paths in call order with consecutive repeats collapsed
    pub(crate) fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = Vec::new();
        for call in self.calls() {
            if stages.last() != Some(&call.path) {
                stages.push(call.path);
            }
        }
        stages
    }

    fn reply_for(&self, host: &str, path: &str) -> Reply {
        let specific = self
            .routes
            .iter()
            .rev()
            .find(|r| r.path == path && r.host.as_deref() == Some(host));
        let generic = || {
            self.routes
                .iter()
                .rev()
                .find(|r| r.path == path && r.host.is_none())
        };

        specific
            .or_else(generic)
            .map(|r| r.reply.clone())
            .unwrap_or(Reply::Unreachable)
    }
}

impl Transport for FakeTransport {
    fn send<'a>(&'a self, host: &'a str, request: &'a HostRequest) -> BoxFuture<'a, HostResult> {
        self.calls.lock().push(RecordedCall {
            host: host.to_string(),
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            timeout: request.timeout,
            authenticated: request.credentials.is_some(),
        });
        let reply = self.reply_for(host, &request.path);

        Box::pin(async move {
            match reply {
                Reply::Body(code, body) if (200..300).contains(&code) => {
                    HostResult::success(host, code, body)
                }
                Reply::Body(code, body) => HostResult::failure(host, code, body),
                Reply::Unreachable => {
                    HostResult::exception(host, HostErrorKind::Connection("connection refused".into()))
                }
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    HostResult::exception(host, HostErrorKind::Connection("hung".into()))
                }
                Reply::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    HostResult::success(host, 200, "{}")
                }
            }
        })
    }
}

pub(crate) fn context_over(fake: &Arc<FakeTransport>) -> ExecContext {
    ExecContext::new(Dispatcher::new(fake.clone()))
}

/// Run one operation's three phases the way the engine does
pub(crate) async fn run_op(op: &mut dyn ClusterOp, ctx: &mut ExecContext) -> Result<()> {
    op.prepare(ctx)?;
    let executed = op.execute(ctx).await;
    op.finalize(ctx)?;
    executed
}

pub(crate) fn hosts(hosts: &[&str]) -> Vec<String> {
    hosts.iter().map(|h| h.to_string()).collect()
}
