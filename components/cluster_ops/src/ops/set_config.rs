use crate::context::{required, ExecContext};
use crate::error::{HostErrorKind, Result};
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Literal value that clears a configuration parameter
pub const CLEAR_VALUE: &str = "null";

/// A configuration parameter change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetConfigurationParameter {
    /// Empty for the main cluster
    pub sandbox: String,
    pub parameter: String,
    /// [`CLEAR_VALUE`] clears the parameter; an empty value is set as is
    pub value: String,
    /// Empty for database level
    pub level: String,
}

#[derive(Serialize)]
struct SetConfigRequest<'a> {
    sandbox: &'a str,
    config_parameter: &'a str,
    value: &'a str,
    level: &'a str,
    db_name: &'a str,
    username: &'a str,
    password: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SetConfigResponse {
    config_parameter: String,
}

/// Sets a configuration parameter through one UP host of the target sandbox
pub struct NMASetConfigurationParameterOp {
    base: OpBase,
    db_name: String,
    user_name: String,
    password: Option<String>,
    change: SetConfigurationParameter,
}

impl NMASetConfigurationParameterOp {
    pub fn new(
        db_name: impl Into<String>,
        user_name: impl Into<String>,
        password: Option<String>,
        change: SetConfigurationParameter,
    ) -> Self {
        Self {
            base: OpBase::new(
                "NMASetConfigurationParameterOp",
                format!("Set configuration parameter {}", change.parameter),
                vec![],
            ),
            db_name: db_name.into(),
            user_name: user_name.into(),
            password,
            change,
        }
    }
}

impl ClusterOp for NMASetConfigurationParameterOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let up = required(&ctx.up_nodes, self.base.name(), "UP hosts")?;
        let sandbox = &self.change.sandbox;
        let host = up
            .host_in_sandbox(sandbox)
            .ok_or_else(|| {
                let target = if sandbox.is_empty() {
                    "the main cluster".to_string()
                } else {
                    format!("sandbox {}", sandbox)
                };
                self.base.precondition(format!("no UP host in {}", target))
            })?
            .to_string();

        let body = SetConfigRequest {
            sandbox,
            config_parameter: &self.change.parameter,
            value: &self.change.value,
            level: &self.change.level,
            db_name: &self.db_name,
            username: &self.user_name,
            password: self.password.as_deref(),
        };
        let request = HostRequest::agent(HttpMethod::Put, "v1/configuration/set");
        let request = self.base.json_request(request, &body)?;

        self.base.set_hosts(vec![host]);
        self.base.set_request_for_all(request);
        Ok(())
    }

    fn process_result(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let parameter = &self.change.parameter;
        self.base.collect_results(|_, result| {
            let response: SetConfigResponse = result.decode()?;
            if !response.config_parameter.eq_ignore_ascii_case(parameter) {
                return Err(HostErrorKind::Rejected(format!(
                    "set {} instead of {}",
                    response.config_parameter, parameter
                )));
            }
            Ok(())
        })?;

        info!(
            "[{}] {} set to {:?}",
            self.base.name(),
            parameter,
            self.change.value
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UpNodes;
    use crate::error::OpError;
    use crate::testing::{context_over, hosts, run_op, FakeTransport, Reply};
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const PATH: &str = "v1/configuration/set";

    fn up_nodes() -> UpNodes {
        UpNodes {
            hosts: hosts(&["10.0.0.1", "10.0.0.2"]),
            sandboxes: BTreeMap::from([
                ("10.0.0.1".to_string(), String::new()),
                ("10.0.0.2".to_string(), "sand".to_string()),
            ]),
        }
    }

    fn change(sandbox: &str) -> SetConfigurationParameter {
        SetConfigurationParameter {
            sandbox: sandbox.into(),
            parameter: "MaxClientSessions".into(),
            value: "100".into(),
            level: String::new(),
        }
    }

    #[tokio::test]
    async fn sent_to_an_up_host_of_the_sandbox() {
        let fake = Arc::new(FakeTransport::new().on(
            PATH,
            Reply::json(r#"{"config_parameter": "maxclientsessions", "value": "100"}"#),
        ));
        let mut ctx = context_over(&fake);
        ctx.up_nodes = Some(up_nodes());
        let mut op = NMASetConfigurationParameterOp::new("test_db", "dbadmin", Some("secret".into()), change("sand"));

        run_op(&mut op, &mut ctx).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "10.0.0.2");
        assert_eq!(calls[0].method, HttpMethod::Put);
        let body = calls[0].json_body();
        assert_eq!(body["config_parameter"], "MaxClientSessions");
        assert_eq!(body["sandbox"], "sand");
        assert_eq!(body["username"], "dbadmin");
    }

    #[tokio::test]
    async fn sandbox_without_up_hosts_fails() {
        let fake = Arc::new(FakeTransport::new());
        let mut ctx = context_over(&fake);
        ctx.up_nodes = Some(up_nodes());
        let mut op = NMASetConfigurationParameterOp::new("test_db", "dbadmin", None, change("other"));

        let err = run_op(&mut op, &mut ctx).await.unwrap_err();

        assert_matches!(&err, OpError::Precondition { .. });
        assert!(err.to_string().ends_with("no UP host in sandbox other"));
    }

    #[tokio::test]
    async fn mismatched_echo_is_rejected() {
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(r#"{"config_parameter": "Other"}"#)));
        let mut ctx = context_over(&fake);
        ctx.up_nodes = Some(up_nodes());
        let mut op = NMASetConfigurationParameterOp::new("test_db", "dbadmin", None, change(""));

        let err = run_op(&mut op, &mut ctx).await.unwrap_err();

        assert_matches!(err, OpError::Hosts(_));
    }
}
