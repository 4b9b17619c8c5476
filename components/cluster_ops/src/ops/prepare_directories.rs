use crate::context::ExecContext;
use crate::error::Result;
use crate::op::{check_return_code, ClusterOp, OpBase, ReturnCodeResponse};
use crate::request::{HostRequest, HttpMethod};
use cluster_primitives::CoordinationNode;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
struct PrepareDirectoriesRequest<'a> {
    catalog_path: &'a str,
    storage_locations: &'a [String],
    force_cleanup: bool,
    for_revive: bool,
    ignore_parent: bool,
}

/// Creates catalog and storage directories on every node's host
pub struct NMAPrepareDirectoriesOp {
    base: OpBase,
    host_node_map: BTreeMap<String, CoordinationNode>,
    force_cleanup: bool,
    for_revive: bool,
}

impl NMAPrepareDirectoriesOp {
    pub fn new(
        host_node_map: BTreeMap<String, CoordinationNode>,
        force_cleanup: bool,
        for_revive: bool,
    ) -> Self {
        let hosts = host_node_map.keys().cloned().collect();
        Self {
            base: OpBase::new("NMAPrepareDirectoriesOp", "Prepare database directories", hosts),
            host_node_map,
            force_cleanup,
            for_revive,
        }
    }
}

impl ClusterOp for NMAPrepareDirectoriesOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.base.clear_requests();

        for (host, node) in &self.host_node_map {
            let body = PrepareDirectoriesRequest {
                catalog_path: &node.catalog_path,
                storage_locations: &node.storage_locations,
                force_cleanup: self.force_cleanup,
                for_revive: self.for_revive,
                ignore_parent: false,
            };
            let request = HostRequest::agent(HttpMethod::Post, "v1/directories/prepare");
            let request = self.base.json_request(request, &body)?;
            self.base.set_request(host.clone(), request);
        }
        Ok(())
    }

    fn process_result(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.base.collect_results(|_, result| {
            let response: ReturnCodeResponse = result.decode()?;
            check_return_code(response.return_code)
        })
    }
}
