use crate::context::{ExecContext, NetworkProfile};
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use std::collections::BTreeMap;

/// Asks each agent which interface carries its host's address
pub struct NMANetworkProfileOp {
    base: OpBase,
}

impl NMANetworkProfileOp {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            base: OpBase::new("NMANetworkProfileOp", "Get network profiles", hosts),
        }
    }
}

impl ClusterOp for NMANetworkProfileOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.base.clear_requests();
        for host in self.base.hosts().to_vec() {
            let request = HostRequest::agent(HttpMethod::Get, "v1/network-profiles")
                .with_query("broadcast-hint", host.clone());
            self.base.set_request(host, request);
        }
        Ok(())
    }

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut profiles = BTreeMap::new();

        self.base.collect_results(|host, result| {
            let profile: NetworkProfile = result.decode()?;
            profiles.insert(host.to_string(), profile);
            Ok(())
        })?;

        ctx.network_profiles = Some(profiles);
        Ok(())
    }
}
