use crate::context::{CatalogEditorDatabase, CatalogEditorNode, ExecContext};
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CatalogVersions {
    global: u64,
}

#[derive(Debug, Deserialize)]
struct CatalogEditorResponse {
    name: String,
    versions: CatalogVersions,
    #[serde(default)]
    nodes: Vec<CatalogEditorNode>,
}

/// Reads the on-disk catalog of each host while the database is down
///
/// Records which hosts hold the newest catalog (highest global version)
/// and the node list each host's catalog describes.
pub struct NMAReadCatalogEditorOp {
    base: OpBase,
}

impl NMAReadCatalogEditorOp {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            base: OpBase::new("NMAReadCatalogEditorOp", "Read catalogs", hosts),
        }
    }
}

impl ClusterOp for NMAReadCatalogEditorOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.base
            .set_request_for_all(HostRequest::agent(HttpMethod::Get, "v1/catalog/database"));
        Ok(())
    }

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut responses: BTreeMap<String, CatalogEditorResponse> = BTreeMap::new();

        self.base.collect_results(|host, result| {
            responses.insert(host.to_string(), result.decode()?);
            Ok(())
        })?;

        let Some(latest) = responses.values().map(|r| r.versions.global).max() else {
            return Err(self.base.missing_context("no host reported a catalog"));
        };

        let hosts_with_latest: Vec<String> = responses
            .iter()
            .filter(|(_, r)| r.versions.global == latest)
            .map(|(host, _)| host.clone())
            .collect();
        info!(
            "[{}] latest catalog version {} on {}",
            self.base.name(),
            latest,
            hosts_with_latest.join(", ")
        );

        let name = responses
            .values()
            .next()
            .map(|r| r.name.clone())
            .unwrap_or_default();
        let host_nodes_map = responses
            .into_iter()
            .map(|(host, r)| (host, r.nodes))
            .collect();

        ctx.hosts_with_latest_catalog = Some(hosts_with_latest);
        ctx.catalog_editor = Some(CatalogEditorDatabase {
            name,
            host_nodes_map,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_over, hosts, run_op, FakeTransport, Reply};
    use serde_json::json;
    use std::sync::Arc;

    const PATH: &str = "v1/catalog/database";

    fn catalog(version: u64) -> String {
        json!({
            "name": "test_db",
            "versions": { "global": version },
            "nodes": [
                { "name": "v_test_db_node0001", "address": "10.0.0.1", "start_command": ["vertica", "-n", "v_test_db_node0001"] },
                { "name": "v_test_db_node0002", "address": "10.0.0.2", "start_command": ["vertica", "-n", "v_test_db_node0002"] }
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn picks_hosts_with_highest_global_version() {
        let fake = Arc::new(
            FakeTransport::new()
                .on_host("10.0.0.1", PATH, Reply::json(catalog(7)))
                .on_host("10.0.0.2", PATH, Reply::json(catalog(9)))
                .on_host("10.0.0.3", PATH, Reply::json(catalog(9))),
        );
        let mut ctx = context_over(&fake);
        let mut op = NMAReadCatalogEditorOp::new(hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]));

        run_op(&mut op, &mut ctx).await.unwrap();

        assert_eq!(
            ctx.hosts_with_latest_catalog,
            Some(hosts(&["10.0.0.2", "10.0.0.3"]))
        );
        let editor = ctx.catalog_editor.unwrap();
        assert_eq!(editor.name, "test_db");
        assert_eq!(editor.host_nodes_map["10.0.0.2"][1].start_command[2], "v_test_db_node0002");
    }

    #[tokio::test]
    async fn any_unreadable_catalog_fails_the_stage() {
        let fake = Arc::new(FakeTransport::new().on_host("10.0.0.1", PATH, Reply::json(catalog(7))));
        let mut ctx = context_over(&fake);
        let mut op = NMAReadCatalogEditorOp::new(hosts(&["10.0.0.1", "10.0.0.2"]));

        assert!(run_op(&mut op, &mut ctx).await.is_err());
        assert!(ctx.hosts_with_latest_catalog.is_none());
    }
}
