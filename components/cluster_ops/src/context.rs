//! State shared by the operations of one pipeline run
//!
//! Every field starts out empty and is filled by some operation. A later
//! operation that needs a field checks for it with [`required`] and fails
//! its prepare phase if nobody populated it.

use crate::dispatcher::Dispatcher;
use crate::error::{OpError, Result};
use cluster_primitives::{CoordinationDatabase, RestorePoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Network interface details an agent reports for its host
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub netmask: String,
    #[serde(default)]
    pub broadcast: String,
}

/// A node as described by the catalog editor on some host
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogEditorNode {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub catalog_path: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub start_command: Vec<String>,
}

/// What the catalog editors reported, per host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogEditorDatabase {
    pub name: String,
    pub host_nodes_map: BTreeMap<String, Vec<CatalogEditorNode>>,
}

/// Hosts whose database node is UP, and the sandbox each belongs to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpNodes {
    pub hosts: Vec<String>,
    /// host -> sandbox name, empty for the main cluster
    pub sandboxes: BTreeMap<String, String>,
}

impl UpNodes {
    /// First up host in `sandbox`, in host order
    pub fn host_in_sandbox(&self, sandbox: &str) -> Option<&str> {
        self.hosts
            .iter()
            .find(|host| self.sandboxes.get(*host).map(String::as_str).unwrap_or("") == sandbox)
            .map(String::as_str)
    }
}

pub struct ExecContext {
    dispatcher: Dispatcher,
    pub hosts_with_latest_catalog: Option<Vec<String>>,
    /// node name -> command line that starts it
    pub startup_command_map: Option<BTreeMap<String, Vec<String>>>,
    pub catalog_editor: Option<CatalogEditorDatabase>,
    pub db_info: Option<String>,
    pub restore_points: Option<Vec<RestorePoint>>,
    pub vdb: Option<CoordinationDatabase>,
    pub network_profiles: Option<BTreeMap<String, NetworkProfile>>,
    pub up_nodes: Option<UpNodes>,
}

impl ExecContext {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            hosts_with_latest_catalog: None,
            startup_command_map: None,
            catalog_editor: None,
            db_info: None,
            restore_points: None,
            vdb: None,
            network_profiles: None,
            up_nodes: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecContext")
            .field("hosts_with_latest_catalog", &self.hosts_with_latest_catalog)
            .field("startup_command_map", &self.startup_command_map)
            .field("catalog_editor", &self.catalog_editor)
            .field("db_info", &self.db_info.as_ref().map(String::len))
            .field("restore_points", &self.restore_points)
            .field("vdb", &self.vdb)
            .field("network_profiles", &self.network_profiles)
            .field("up_nodes", &self.up_nodes)
            .finish()
    }
}

/// Borrow a context field an earlier operation should have populated
pub fn required<'a, T>(field: &'a Option<T>, op: &str, what: &str) -> Result<&'a T> {
    field.as_ref().ok_or_else(|| OpError::MissingContext {
        op: op.to_string(),
        message: format!("{} has not been discovered by an earlier operation", what),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use std::sync::Arc;

    #[test]
    fn fields_start_empty() {
        let ctx = ExecContext::new(Dispatcher::new(Arc::new(FakeTransport::new())));

        assert!(ctx.vdb.is_none());
        assert!(ctx.restore_points.is_none());
        assert!(ctx.up_nodes.is_none());
    }

    #[test]
    fn required_reports_missing_field() {
        let ctx = ExecContext::new(Dispatcher::new(Arc::new(FakeTransport::new())));

        let err = required(&ctx.network_profiles, "NMALoadRemoteCatalogOp", "network profiles")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "[NMALoadRemoteCatalogOp] network profiles has not been discovered by an earlier operation"
        );
    }

    #[test]
    fn up_host_lookup_respects_sandbox() {
        let up = UpNodes {
            hosts: vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into()],
            sandboxes: BTreeMap::from([
                ("10.0.0.1".to_string(), "sand".to_string()),
                ("10.0.0.2".to_string(), String::new()),
            ]),
        };

        assert_eq!(up.host_in_sandbox(""), Some("10.0.0.2"));
        assert_eq!(up.host_in_sandbox("sand"), Some("10.0.0.1"));
        assert_eq!(up.host_in_sandbox("other"), None);
    }
}
