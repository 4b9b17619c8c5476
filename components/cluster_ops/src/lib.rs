//! Operation pipeline engine for multi-host cluster administration
//!
//! Commands are built from operations ([`ClusterOp`]) run in order by a
//! [`ClusterOpEngine`]. Each operation fans its requests out to every
//! target host at once through the [`Dispatcher`] and collects every
//! host's failure before the pipeline stops.

mod context;
mod dispatcher;
mod engine;
mod error;
mod op;
mod request;
mod result;
mod transport;

pub mod ops;
pub mod workflows;

#[cfg(test)]
mod testing;

pub use context::{
    required, CatalogEditorDatabase, CatalogEditorNode, ExecContext, NetworkProfile, UpNodes,
};
pub use dispatcher::Dispatcher;
pub use engine::ClusterOpEngine;
pub use error::{
    HostError, HostErrorKind, HostErrors, OpError, Result, TransportError, WorkflowError,
};
pub use op::{check_return_code, ClusterOp, Instructions, OpBase, ReturnCodeResponse};
pub use request::{Credentials, HostRequest, HttpMethod, Service};
pub use result::{HostResult, ResultStatus};
pub use transport::{
    HttpTransport, HttpsCerts, Scheme, Transport, TransportConfig, DEFAULT_AGENT_PORT,
    DEFAULT_DATABASE_PORT, DEFAULT_REQUEST_TIMEOUT,
};
pub use workflows::ClusterCommands;
