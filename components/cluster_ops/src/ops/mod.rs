//! Concrete pipeline stages, one per remote administrative action

mod check_running;
mod download_file;
mod get_up_nodes;
mod health;
mod load_remote_catalog;
mod network_profile;
mod prepare_directories;
mod read_catalog_editor;
mod set_config;
mod show_restore_points;
mod start_node;
mod startup_command;

pub use check_running::HTTPSCheckRunningDBOp;
pub use download_file::{DownloadPurpose, NMADownloadFileOp};
pub use get_up_nodes::HTTPSGetUpNodesOp;
pub use health::NMAHealthOp;
pub use load_remote_catalog::NMALoadRemoteCatalogOp;
pub use network_profile::NMANetworkProfileOp;
pub use prepare_directories::NMAPrepareDirectoriesOp;
pub use read_catalog_editor::NMAReadCatalogEditorOp;
pub use set_config::{NMASetConfigurationParameterOp, SetConfigurationParameter, CLEAR_VALUE};
pub use show_restore_points::NMAShowRestorePointsOp;
pub use start_node::NMAStartNodeOp;
pub use startup_command::HTTPSStartUpCommandOp;

use std::fmt;

/// The command an operation is running on behalf of, used in messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    ReviveDb,
    StartDb,
    StartNode,
    SetConfigurationParameters,
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpType::ReviveDb => "revive_db",
            OpType::StartDb => "start_db",
            OpType::StartNode => "start_node",
            OpType::SetConfigurationParameters => "set_configuration_parameters",
        };
        f.write_str(name)
    }
}

/// The first host of a list runs single-host steps
pub fn initiator(hosts: &[String]) -> Vec<String> {
    hosts.first().cloned().into_iter().collect()
}
