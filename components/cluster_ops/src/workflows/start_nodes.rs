use super::options::DatabaseOptions;
use super::ClusterCommands;
use crate::error::WorkflowError;
use crate::op::Instructions;
use crate::ops::{HTTPSGetUpNodesOp, HTTPSStartUpCommandOp, NMAHealthOp, NMAStartNodeOp, OpType};
use cluster_primitives::{CoordinationDatabase, ValidationError};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct StartNodesOptions {
    pub base: DatabaseOptions,
    /// Node names to start; empty means every DOWN node
    pub nodes: Vec<String>,
}

impl StartNodesOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate_db_name()?;
        if self.base.raw_hosts.is_empty() {
            return Err(ValidationError::MissingHosts);
        }
        Ok(())
    }
}

/// Hosts of the requested nodes that are not already UP
pub fn select_nodes_to_start(
    vdb: &CoordinationDatabase,
    requested: &[String],
) -> Result<Vec<String>, ValidationError> {
    for name in requested {
        if vdb.find_node_by_name(name).is_none() {
            return Err(ValidationError::Other(format!(
                "node {} does not exist in database {}",
                name, vdb.name
            )));
        }
    }

    Ok(vdb
        .host_node_map
        .values()
        .filter(|node| requested.is_empty() || requested.contains(&node.name))
        .filter(|node| node.state != "UP")
        .map(|node| node.address.clone())
        .collect())
}

impl ClusterCommands {
    /// Start DOWN nodes of a running database; returns the hosts started
    pub async fn start_nodes(
        &self,
        mut options: StartNodesOptions,
    ) -> Result<Vec<String>, WorkflowError> {
        options.validate()?;
        options.base.resolve_hosts().await?;
        let base = &options.base;

        let discover: Instructions = vec![
            Box::new(NMAHealthOp::new(base.hosts.clone())),
            Box::new(HTTPSGetUpNodesOp::new(
                base.db_name.clone(),
                base.hosts.clone(),
                base.credentials(),
                OpType::StartNode,
            )),
        ];
        let ctx = self
            .run(discover, "fail to collect the state of nodes")
            .await?;

        let vdb = ctx.vdb.unwrap_or_default();
        let up_hosts = ctx.up_nodes.map(|up| up.hosts).unwrap_or_default();
        let to_start = select_nodes_to_start(&vdb, &options.nodes)?;
        if to_start.is_empty() {
            info!("every requested node is already UP");
            return Ok(to_start);
        }

        let start: Instructions = vec![
            Box::new(HTTPSStartUpCommandOp::new(up_hosts, base.credentials())),
            Box::new(NMAStartNodeOp::with_vdb(to_start.clone(), vdb)),
        ];
        self.run(start, "fail to start nodes").await?;
        Ok(to_start)
    }
}
