use crate::context::ExecContext;
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use std::collections::BTreeMap;

/// Checks that the node management agent answers on every host
pub struct NMAHealthOp {
    base: OpBase,
}

impl NMAHealthOp {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            base: OpBase::new("NMAHealthOp", "Check agent health", hosts),
        }
    }
}

impl ClusterOp for NMAHealthOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.base
            .set_request_for_all(HostRequest::agent(HttpMethod::Get, "v1/health"));
        Ok(())
    }

    fn process_result(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        // a healthy agent answers with a JSON object
        self.base.collect_results(|_, result| {
            result.decode::<BTreeMap<String, serde_json::Value>>()?;
            Ok(())
        })
    }
}
