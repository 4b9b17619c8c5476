use super::options::DatabaseOptions;
use super::ClusterCommands;
use crate::error::WorkflowError;
use crate::op::Instructions;
use crate::ops::{
    HTTPSCheckRunningDBOp, NMAHealthOp, NMAReadCatalogEditorOp, NMAStartNodeOp, OpType,
};
use cluster_primitives::ValidationError;

#[derive(Debug, Clone, Default)]
pub struct StartDatabaseOptions {
    pub base: DatabaseOptions,
}

impl StartDatabaseOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate_db_name()?;
        if self.base.raw_hosts.is_empty() {
            return Err(ValidationError::MissingHosts);
        }
        Ok(())
    }
}

/// Start a stopped database with the start commands in the newest catalog
pub fn produce_start_db_instructions(options: &StartDatabaseOptions) -> Instructions {
    let hosts = &options.base.hosts;
    vec![
        Box::new(NMAHealthOp::new(hosts.clone())),
        Box::new(HTTPSCheckRunningDBOp::new(
            hosts.clone(),
            options.base.credentials(),
            OpType::StartDb,
        )),
        Box::new(NMAReadCatalogEditorOp::new(hosts.clone())),
        Box::new(NMAStartNodeOp::new(hosts.clone())),
    ]
}

impl ClusterCommands {
    /// Start every node of a stopped database; returns the hosts started
    pub async fn start_database(
        &self,
        mut options: StartDatabaseOptions,
    ) -> Result<Vec<String>, WorkflowError> {
        options.validate()?;
        options.base.resolve_hosts().await?;

        self.run(produce_start_db_instructions(&options), "fail to start database")
            .await?;
        Ok(options.base.hosts)
    }
}
