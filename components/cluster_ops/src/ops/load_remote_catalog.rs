use crate::context::{required, ExecContext};
use crate::error::Result;
use crate::op::{check_return_code, ClusterOp, OpBase, ReturnCodeResponse};
use crate::request::{HostRequest, HttpMethod};
use cluster_primitives::{CoordinationDatabase, RestorePointPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
struct LoadRemoteCatalogRequest<'a> {
    db_name: &'a str,
    communal_location: &'a str,
    catalog_path: &'a str,
    storage_locations: &'a [String],
    host: &'a str,
    node_name: &'a str,
    node_address: &'a str,
    broadcast: &'a str,
    parameters: &'a BTreeMap<String, String>,
    restore_point_archive: &'a str,
    restore_point_index: u32,
    restore_point_id: &'a str,
}

/// Loads each node's catalog fragment from communal storage onto its new host
///
/// `old_hosts[i]` is the address the node now living on `vdb.host_list[i]`
/// had when the catalog was written.
pub struct NMALoadRemoteCatalogOp {
    base: OpBase,
    old_hosts: Vec<String>,
    parameters: BTreeMap<String, String>,
    vdb: CoordinationDatabase,
    timeout: Duration,
    restore_policy: RestorePointPolicy,
}

impl NMALoadRemoteCatalogOp {
    pub fn new(
        old_hosts: Vec<String>,
        parameters: BTreeMap<String, String>,
        vdb: CoordinationDatabase,
        timeout: Duration,
        restore_policy: RestorePointPolicy,
    ) -> Self {
        Self {
            base: OpBase::new(
                "NMALoadRemoteCatalogOp",
                "Load the catalog from communal storage",
                vdb.host_list.clone(),
            ),
            old_hosts,
            parameters,
            vdb,
            timeout,
            restore_policy,
        }
    }
}

impl ClusterOp for NMALoadRemoteCatalogOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let profiles = required(&ctx.network_profiles, self.base.name(), "network profiles")?;

        if self.old_hosts.len() != self.vdb.host_list.len() {
            return Err(self.base.precondition(format!(
                "{} old hosts for {} new hosts",
                self.old_hosts.len(),
                self.vdb.host_list.len()
            )));
        }

        self.base.clear_requests();
        for (host, old_host) in self.vdb.host_list.iter().zip(&self.old_hosts) {
            let node = self.vdb.host_node_map.get(host).ok_or_else(|| {
                self.base
                    .missing_context(format!("host {} has no node in the topology", host))
            })?;
            let profile = profiles.get(host).ok_or_else(|| {
                self.base
                    .missing_context(format!("no network profile for host {}", host))
            })?;

            let body = LoadRemoteCatalogRequest {
                db_name: &self.vdb.name,
                communal_location: &self.vdb.communal_storage_location,
                catalog_path: &node.catalog_path,
                storage_locations: &node.storage_locations,
                host: old_host,
                node_name: &node.name,
                node_address: host,
                broadcast: &profile.broadcast,
                parameters: &self.parameters,
                restore_point_archive: &self.restore_policy.archive,
                restore_point_index: self.restore_policy.index.unwrap_or(0),
                restore_point_id: self.restore_policy.id.as_deref().unwrap_or(""),
            };
            let request = HostRequest::agent(HttpMethod::Post, "v1/catalog/revive")
                .with_timeout(self.timeout);
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
