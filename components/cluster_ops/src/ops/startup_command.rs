use crate::context::ExecContext;
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{Credentials, HostRequest, HttpMethod};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct StartupCommand {
    node: String,
    start_command: Vec<String>,
}

/// Fetches every node's start command line from one UP host
///
/// The host comes from UP nodes discovered earlier in the same run, or
/// else from the hosts the operation was built with.
pub struct HTTPSStartUpCommandOp {
    base: OpBase,
    credentials: Option<Credentials>,
}

impl HTTPSStartUpCommandOp {
    pub fn new(up_hosts: Vec<String>, credentials: Option<Credentials>) -> Self {
        Self {
            base: OpBase::new("HTTPSStartUpCommandOp", "Get node start commands", up_hosts),
            credentials,
        }
    }
}

impl ClusterOp for HTTPSStartUpCommandOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let host = match &ctx.up_nodes {
            Some(up) => up
                .host_in_sandbox("")
                .or_else(|| up.hosts.first().map(String::as_str))
                .map(str::to_string),
            None => self.base.hosts().first().cloned(),
        }
        .ok_or_else(|| self.base.precondition("no UP host to ask for start commands"))?;

        self.base.set_hosts(vec![host]);
        let request = HostRequest::database(HttpMethod::Get, "v1/startup/commands")
            .with_credentials(self.credentials.clone());
        self.base.set_request_for_all(request);
        Ok(())
    }

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut commands = BTreeMap::new();

        self.base.collect_results(|_, result| {
            let listed: Vec<StartupCommand> = result.decode()?;
            commands.extend(listed.into_iter().map(|c| (c.node, c.start_command)));
            Ok(())
        })?;

        ctx.startup_command_map = Some(commands);
        Ok(())
    }
}
