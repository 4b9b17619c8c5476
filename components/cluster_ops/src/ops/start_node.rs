use crate::context::{required, ExecContext};
use crate::error::Result;
use crate::op::{check_return_code, ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use cluster_primitives::CoordinationDatabase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Serialize)]
struct StartNodeRequest<'a> {
    start_command: &'a [String],
}

#[derive(Debug, Deserialize)]
struct StartNodeResponse {
    #[serde(rename = "dbLogPath", default)]
    db_log_path: String,
    #[serde(default)]
    return_code: i64,
}

/// Starts the database process on each target host
///
/// Start commands come from the running database when an earlier stage
/// fetched them, otherwise from the catalog of a host holding the latest
/// catalog.
pub struct NMAStartNodeOp {
    base: OpBase,
    vdb: Option<CoordinationDatabase>,
}

impl NMAStartNodeOp {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            base: OpBase::new("NMAStartNodeOp", "Start nodes", hosts),
            vdb: None,
        }
    }

    /// Map hosts to node names through `vdb` when start commands are keyed by node
    pub fn with_vdb(hosts: Vec<String>, vdb: CoordinationDatabase) -> Self {
        Self {
            vdb: Some(vdb),
            ..Self::new(hosts)
        }
    }

    fn commands_from_startup_map(
        &self,
        startup: &BTreeMap<String, Vec<String>>,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let vdb = required(&self.vdb, self.base.name(), "the database topology")?;

        self.base
            .hosts()
            .iter()
            .map(|host| -> Result<(String, Vec<String>)> {
                let command = vdb
                    .host_node_map
                    .get(host)
                    .and_then(|node| startup.get(&node.name))
                    .ok_or_else(|| {
                        self.base
                            .missing_context(format!("no start command for host {}", host))
                    })?;
                Ok((host.clone(), command.clone()))
            })
            .collect()
    }

    fn commands_from_catalog(&self, ctx: &ExecContext) -> Result<BTreeMap<String, Vec<String>>> {
        let bootstrap = ctx
            .hosts_with_latest_catalog
            .as_ref()
            .and_then(|hosts| hosts.first())
            .ok_or_else(|| {
                self.base
                    .precondition("could not find at least one host with the latest catalog")
            })?;
        let editor = required(&ctx.catalog_editor, self.base.name(), "the catalog editor")?;
        let nodes = editor.host_nodes_map.get(bootstrap).ok_or_else(|| {
            self.base.precondition(format!(
                "the bootstrap node ({}) is not found from the catalog editor information",
                bootstrap
            ))
        })?;

        self.base
            .hosts()
            .iter()
            .map(|host| -> Result<(String, Vec<String>)> {
                let node = nodes.iter().find(|node| &node.address == host).ok_or_else(|| {
                    self.base
                        .missing_context(format!("host {} is not in the catalog of {}", host, bootstrap))
                })?;
                Ok((host.clone(), node.start_command.clone()))
            })
            .collect()
    }
}

impl ClusterOp for NMAStartNodeOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let commands = match &ctx.startup_command_map {
            Some(startup) => self.commands_from_startup_map(startup)?,
            None => self.commands_from_catalog(ctx)?,
        };

        self.base.clear_requests();
        for (host, command) in commands {
            let body = StartNodeRequest {
                start_command: &command,
            };
            let request = HostRequest::agent(HttpMethod::Post, "v1/nodes/start");
            let request = self.base.json_request(request, &body)?;
            self.base.set_request(host, request);
        }
        Ok(())
    }

    fn process_result(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let name = self.base.name();
        self.base.collect_results(|host, result| {
            let response: StartNodeResponse = result.decode()?;
            check_return_code(response.return_code)?;
            info!("[{}] {} started, log at {}", name, host, response.db_log_path);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CatalogEditorDatabase, CatalogEditorNode};
    use crate::error::{HostErrorKind, OpError};
    use crate::testing::{context_over, hosts, run_op, FakeTransport, Reply};
    use assert_matches::assert_matches;
    use cluster_primitives::CoordinationNode;
    use std::sync::Arc;

    const PATH: &str = "v1/nodes/start";
    const STARTED: &str = r#"{"dbLogPath": "/data/test_db/dbLog", "return_code": 0}"#;

    fn command(node: &str) -> Vec<String> {
        vec!["/opt/vertica/bin/vertica".into(), "-n".into(), node.into()]
    }

    fn editor_node(name: &str, address: &str) -> CatalogEditorNode {
        CatalogEditorNode {
            name: name.into(),
            address: address.into(),
            start_command: command(name),
            ..CatalogEditorNode::default()
        }
    }

    #[tokio::test]
    async fn uses_running_database_commands_by_node_name() {
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(STARTED)));
        let mut ctx = context_over(&fake);
        ctx.startup_command_map = Some(BTreeMap::from([
            ("v_test_db_node0001".to_string(), command("v_test_db_node0001")),
            ("v_test_db_node0002".to_string(), command("v_test_db_node0002")),
        ]));
        let mut vdb = CoordinationDatabase::new("test_db");
        vdb.add_node(CoordinationNode::new("v_test_db_node0001", "10.0.0.1"));
        vdb.add_node(CoordinationNode::new("v_test_db_node0002", "10.0.0.2"));
        let mut op = NMAStartNodeOp::with_vdb(hosts(&["10.0.0.2"]), vdb);

        run_op(&mut op, &mut ctx).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "10.0.0.2");
        assert_eq!(calls[0].json_body()["start_command"][2], "v_test_db_node0002");
    }

    #[tokio::test]
    async fn falls_back_to_latest_catalog() {
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(STARTED)));
        let mut ctx = context_over(&fake);
        ctx.hosts_with_latest_catalog = Some(hosts(&["10.0.0.2"]));
        ctx.catalog_editor = Some(CatalogEditorDatabase {
            name: "test_db".into(),
            host_nodes_map: BTreeMap::from([(
                "10.0.0.2".to_string(),
                vec![
                    editor_node("v_test_db_node0001", "10.0.0.1"),
                    editor_node("v_test_db_node0002", "10.0.0.2"),
                ],
            )]),
        });
        let mut op = NMAStartNodeOp::new(hosts(&["10.0.0.1", "10.0.0.2"]));

        run_op(&mut op, &mut ctx).await.unwrap();

        let calls = fake.calls_to(PATH);
        assert_eq!(calls.len(), 2);
        let first = calls.iter().find(|c| c.host == "10.0.0.1").unwrap();
        assert_eq!(first.json_body()["start_command"][2], "v_test_db_node0001");
    }

    #[tokio::test]
    async fn no_latest_catalog_fails_before_sending() {
        let fake = Arc::new(FakeTransport::new());
        let mut ctx = context_over(&fake);
        ctx.hosts_with_latest_catalog = Some(vec![]);

        let err = run_op(&mut NMAStartNodeOp::new(hosts(&["10.0.0.1"])), &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "[NMAStartNodeOp] could not find at least one host with the latest catalog"
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn non_zero_return_code_is_a_host_failure() {
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(r#"{"dbLogPath": "", "return_code": 1}"#)));
        let mut ctx = context_over(&fake);
        ctx.hosts_with_latest_catalog = Some(hosts(&["10.0.0.1"]));
        ctx.catalog_editor = Some(CatalogEditorDatabase {
            name: "test_db".into(),
            host_nodes_map: BTreeMap::from([(
                "10.0.0.1".to_string(),
                vec![editor_node("v_test_db_node0001", "10.0.0.1")],
            )]),
        });

        let err = run_op(&mut NMAStartNodeOp::new(hosts(&["10.0.0.1"])), &mut ctx)
            .await
            .unwrap_err();

        let errors = assert_matches!(err, OpError::Hosts(errors) => errors);
        assert_matches!(errors.iter().next().map(|e| &e.kind), Some(HostErrorKind::ReturnCode(1)));
    }
}
