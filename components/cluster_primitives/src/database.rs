use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One database node as the control plane sees it
///
/// `name` is assigned when the database is created and never changes.
/// `address` moves when a database is revived onto a different host set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoordinationNode {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub catalog_path: String,
    #[serde(default)]
    pub storage_locations: Vec<String>,
    #[serde(default)]
    pub user_storage_locations: Vec<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub subcluster: String,
    #[serde(default)]
    pub sandbox: String,
    #[serde(default)]
    pub state: String,
}

impl CoordinationNode {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Storage locations that are not owned by users
    ///
    /// User locations are never force-removed on revive, so directory
    /// preparation only gets the system ones.
    pub fn system_storage_locations(&self) -> Vec<String> {
        let user: BTreeSet<&str> = self
            .user_storage_locations
            .iter()
            .map(String::as_str)
            .collect();

        self.storage_locations
            .iter()
            .filter(|location| !user.contains(location.as_str()))
            .cloned()
            .collect()
    }
}

/// In-memory topology of one database
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoordinationDatabase {
    pub name: String,
    pub communal_storage_location: String,
    pub host_list: Vec<String>,
    pub host_node_map: BTreeMap<String, CoordinationNode>,
    pub is_eon: bool,
    pub ipv6: bool,
}

/// Result of [`CoordinationDatabase::realign`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealignedDatabase {
    /// Topology keyed by the new addresses
    pub vdb: CoordinationDatabase,
    /// `old_hosts[i]` is the address node `i` had before realignment
    pub old_hosts: Vec<String>,
}

impl CoordinationDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Insert a node keyed by its current address, keeping `host_list` in sync
    pub fn add_node(&mut self, node: CoordinationNode) {
        if !self.host_list.contains(&node.address) {
            self.host_list.push(node.address.clone());
        }
        self.host_node_map.insert(node.address.clone(), node);
    }

    pub fn node_count(&self) -> usize {
        self.host_node_map.len()
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<&CoordinationNode> {
        self.host_node_map.values().find(|node| node.name == name)
    }

    /// Pair persisted nodes with a new, user-ordered host list
    ///
    /// Nodes are sorted by their immutable name and the i-th node is moved
    /// to `new_hosts[i]`. For example, nodes `node0001@192.168.1.101` and
    /// `node0002@192.168.1.102` realigned onto `[10.1.10.2, 10.1.10.1]`
    /// give `node0001@10.1.10.2`, `node0002@10.1.10.1` and old hosts
    /// `[192.168.1.101, 192.168.1.102]`.
    pub fn realign(&self, new_hosts: &[String]) -> Result<RealignedDatabase, ValidationError> {
        if new_hosts.len() != self.node_count() {
            return Err(ValidationError::HostCountMismatch {
                hosts: new_hosts.len(),
                nodes: self.node_count(),
            });
        }

        if let Some(duplicate) = first_duplicate(new_hosts) {
            return Err(ValidationError::DuplicateHost(duplicate.to_string()));
        }

        let mut nodes: Vec<&CoordinationNode> = self.host_node_map.values().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut vdb = CoordinationDatabase {
            name: self.name.clone(),
            communal_storage_location: self.communal_storage_location.clone(),
            host_list: new_hosts.to_vec(),
            host_node_map: BTreeMap::new(),
            is_eon: self.is_eon,
            ipv6: self.ipv6,
        };
        let mut old_hosts = Vec::with_capacity(nodes.len());

        for (node, new_host) in nodes.into_iter().zip(new_hosts) {
            old_hosts.push(node.address.clone());
            let mut moved = node.clone();
            moved.address = new_host.clone();
            vdb.host_node_map.insert(new_host.clone(), moved);
        }

        Ok(RealignedDatabase { vdb, old_hosts })
    }
}

/// First host that appears more than once in `hosts`
pub fn first_duplicate(hosts: &[String]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    hosts
        .iter()
        .map(String::as_str)
        .find(|host| !seen.insert(*host))
}
