use super::OpType;
use crate::context::ExecContext;
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{Credentials, HostRequest, HttpMethod};
use tracing::debug;

/// Makes sure no database is running on the target hosts
///
/// Any host whose database service answers at all, even with an
/// authentication failure, has a running database. Hosts that cannot be
/// reached are taken to be down.
pub struct HTTPSCheckRunningDBOp {
    base: OpBase,
    credentials: Option<Credentials>,
    op_type: OpType,
}

impl HTTPSCheckRunningDBOp {
    pub fn new(hosts: Vec<String>, credentials: Option<Credentials>, op_type: OpType) -> Self {
        Self {
            base: OpBase::new(
                "HTTPSCheckRunningDBOp",
                "Check that no database is running",
                hosts,
            ),
            credentials,
            op_type,
        }
    }
}

impl ClusterOp for HTTPSCheckRunningDBOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let request = HostRequest::database(HttpMethod::Get, "v1/nodes")
            .with_credentials(self.credentials.clone());
        self.base.set_request_for_all(request);
        Ok(())
    }

    fn process_result(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let mut running = Vec::new();

        for (host, result) in self.base.results() {
            if result.is_unreachable() {
                debug!("[{}] no database answering on {}", self.base.name(), host);
            } else {
                running.push(host.as_str());
            }
        }

        if running.is_empty() {
            return Ok(());
        }

        Err(self.base.precondition(format!(
            "database is running on host(s) {}; stop it before running {}",
            running.join(", "),
            self.op_type
        )))
    }
}
