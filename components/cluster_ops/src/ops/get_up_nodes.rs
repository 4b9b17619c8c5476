use super::OpType;
use crate::context::{ExecContext, UpNodes};
use crate::error::{HostErrorKind, HostErrors, Result};
use crate::op::{ClusterOp, OpBase};
use crate::request::{Credentials, HostRequest, HttpMethod};
use crate::result::HostResult;
use cluster_primitives::{CoordinationDatabase, CoordinationNode};
use serde::Deserialize;
use tracing::{debug, info};

const STATE_UP: &str = "UP";

#[derive(Debug, Deserialize)]
struct NodeState {
    name: String,
    address: String,
    state: String,
    #[serde(default)]
    database: String,
    #[serde(default)]
    catalog_path: String,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    subcluster_name: String,
    #[serde(default)]
    sandbox: String,
}

impl From<&NodeState> for CoordinationNode {
    fn from(node: &NodeState) -> Self {
        CoordinationNode {
            catalog_path: node.catalog_path.clone(),
            is_primary: node.is_primary,
            subcluster: node.subcluster_name.clone(),
            sandbox: node.sandbox.clone(),
            state: node.state.clone(),
            ..CoordinationNode::new(node.name.clone(), node.address.clone())
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    node_list: Vec<NodeState>,
}

/// Asks the running database which nodes are UP
///
/// One answering host is enough since every node reports the whole
/// cluster. The node list also becomes the context's topology.
pub struct HTTPSGetUpNodesOp {
    base: OpBase,
    db_name: String,
    credentials: Option<Credentials>,
    op_type: OpType,
}

impl HTTPSGetUpNodesOp {
    pub fn new(
        db_name: impl Into<String>,
        hosts: Vec<String>,
        credentials: Option<Credentials>,
        op_type: OpType,
    ) -> Self {
        Self {
            base: OpBase::new("HTTPSGetUpNodesOp", "Collect UP nodes", hosts),
            db_name: db_name.into(),
            credentials,
            op_type,
        }
    }

    fn read_nodes(&self, result: &HostResult) -> std::result::Result<NodesResponse, HostErrorKind> {
        let response: NodesResponse = result.decode()?;

        if let Some(other) = response
            .node_list
            .iter()
            .find(|node| !node.database.is_empty() && node.database != self.db_name)
        {
            return Err(HostErrorKind::Rejected(format!(
                "host runs database {} instead of {}",
                other.database, self.db_name
            )));
        }
        Ok(response)
    }
}

impl ClusterOp for HTTPSGetUpNodesOp {
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

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut errors = HostErrors::new();
        let mut answer = None;

        for (host, result) in self.base.results() {
            self.base.log_response(host, result);
            let outcome = if result.is_passing() {
                self.read_nodes(result)
            } else {
                Err(result.error_kind())
            };
            match outcome {
                Ok(response) => {
                    answer = Some(response);
                    break;
                }
                Err(kind) => errors.push(self.base.host_error(host, kind)),
            }
        }

        let Some(response) = answer else {
            errors.into_result()?;
            return Err(self.base.missing_context("no host to ask for UP nodes"));
        };
        if !errors.is_empty() {
            debug!("[{}] ignoring failures from {}", self.base.name(), errors.hosts().join(", "));
        }

        let mut up = UpNodes::default();
        let mut vdb = CoordinationDatabase::new(self.db_name.clone());
        for node in &response.node_list {
            if node.state == STATE_UP {
                up.hosts.push(node.address.clone());
                up.sandboxes.insert(node.address.clone(), node.sandbox.clone());
            }
            vdb.add_node(node.into());
        }

        if up.hosts.is_empty() {
            return Err(self.base.precondition(format!(
                "no UP nodes found; the database must be running to {}",
                self.op_type
            )));
        }
        info!("[{}] UP hosts: {}", self.base.name(), up.hosts.join(", "));

        ctx.up_nodes = Some(up);
        ctx.vdb = Some(vdb);
        Ok(())
    }
}
