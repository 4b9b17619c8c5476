use super::options::DatabaseOptions;
use super::ClusterCommands;
use crate::error::WorkflowError;
use crate::op::Instructions;
use crate::ops::{
    HTTPSGetUpNodesOp, NMAHealthOp, NMASetConfigurationParameterOp, OpType,
    SetConfigurationParameter,
};
use cluster_primitives::ValidationError;

#[derive(Debug, Clone, Default)]
pub struct SetConfigurationParameterOptions {
    pub base: DatabaseOptions,
    pub change: SetConfigurationParameter,
}

impl SetConfigurationParameterOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate_db_name()?;

        if self.base.password.is_none() && !self.base.certs.has_client_identity() {
            return Err(ValidationError::Other(
                "must provide a password, or a key and certificate".to_string(),
            ));
        }
        // an empty value is allowed and differs from clearing with "null"
        if self.change.parameter.is_empty() {
            return Err(ValidationError::Other(
                "configuration parameter must not be empty".to_string(),
            ));
        }
        if self.base.user_name.is_empty() {
            return Err(ValidationError::Other("must specify a user name".to_string()));
        }
        Ok(())
    }

    pub async fn analyze(&mut self) -> Result<(), WorkflowError> {
        if self.base.raw_hosts.is_empty() && self.base.hosts.is_empty() {
            return Err(ValidationError::MissingHosts.into());
        }
        if !self.base.raw_hosts.is_empty() {
            self.base.resolve_hosts().await?;
        }
        Ok(())
    }
}

/// Agent health, UP nodes with their sandboxes, then the change itself
pub fn produce_set_config_instructions(options: &SetConfigurationParameterOptions) -> Instructions {
    let base = &options.base;
    vec![
        Box::new(NMAHealthOp::new(base.hosts.clone())),
        Box::new(HTTPSGetUpNodesOp::new(
            base.db_name.clone(),
            base.hosts.clone(),
            base.credentials(),
            OpType::SetConfigurationParameters,
        )),
        Box::new(NMASetConfigurationParameterOp::new(
            base.db_name.clone(),
            base.user_name.clone(),
            base.password.clone(),
            options.change.clone(),
        )),
    ]
}

impl ClusterCommands {
    /// Set or clear (value `null`) a configuration parameter
    pub async fn set_configuration_parameter(
        &self,
        mut options: SetConfigurationParameterOptions,
    ) -> Result<(), WorkflowError> {
        options.validate()?;
        options.analyze().await?;

        self.run(
            produce_set_config_instructions(&options),
            "fail to set configuration parameter",
        )
        .await?;
        Ok(())
    }
}
