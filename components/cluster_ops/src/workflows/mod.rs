//! Per-command workflows: validate options, build instruction lists, run them
//!
//! A workflow may run the engine several times. Each run gets a fresh
//! context; anything a later run needs is copied out of the previous
//! run's context and handed to the operations built for the next one.

mod options;
mod revive_db;
mod set_config;
mod start_db;
mod start_nodes;

pub use options::{resolve_hosts, DatabaseOptions};
pub use revive_db::{
    produce_pre_revive_instructions, produce_restore_specific_instructions,
    produce_revive_instructions, revive_topology, ReviveDatabaseOptions, ReviveOutcome,
    DEFAULT_LOAD_CATALOG_TIMEOUT,
};
pub use set_config::{produce_set_config_instructions, SetConfigurationParameterOptions};
pub use start_db::{produce_start_db_instructions, StartDatabaseOptions};
pub use start_nodes::{select_nodes_to_start, StartNodesOptions};

use crate::context::ExecContext;
use crate::dispatcher::Dispatcher;
use crate::engine::ClusterOpEngine;
use crate::error::{TransportError, WorkflowError};
use crate::op::Instructions;
use crate::transport::{HttpTransport, HttpsCerts, Transport, TransportConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point for every administrative command
#[derive(Clone)]
pub struct ClusterCommands {
    transport: Arc<dyn Transport>,
    request_timeout: Option<Duration>,
}

impl ClusterCommands {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_timeout: None,
        }
    }

    /// Talk to real hosts over HTTPS
    pub fn over_http(config: TransportConfig, certs: &HttpsCerts) -> Result<Self, TransportError> {
        let request_timeout = config.request_timeout;
        let transport = HttpTransport::new(config, certs)?;
        Ok(Self::new(Arc::new(transport)).with_request_timeout(request_timeout))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn dispatcher(&self) -> Dispatcher {
        let dispatcher = Dispatcher::new(self.transport.clone());
        match self.request_timeout {
            Some(timeout) => dispatcher.with_timeout(timeout),
            None => dispatcher,
        }
    }

    /// One engine run; failures come back tagged with `action`
    async fn run(
        &self,
        instructions: Instructions,
        action: &'static str,
    ) -> Result<ExecContext, WorkflowError> {
        let engine = ClusterOpEngine::new(instructions, self.dispatcher());
        info!("running {} stages: {}", engine.len(), engine.summary().join(" -> "));
        engine.run().await.map_err(WorkflowError::failed(action))
    }
}

impl std::fmt::Debug for ClusterCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCommands")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
