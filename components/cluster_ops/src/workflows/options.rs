use crate::error::WorkflowError;
use crate::request::Credentials;
use crate::transport::HttpsCerts;
use cluster_primitives::{validate_db_name, ValidationError};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

/// Options every command shares
#[derive(Debug, Clone, Default)]
pub struct DatabaseOptions {
    pub db_name: String,
    /// Hosts as the user typed them
    pub raw_hosts: Vec<String>,
    /// `raw_hosts` resolved to addresses
    pub hosts: Vec<String>,
    pub ipv6: bool,
    pub communal_storage_location: String,
    /// Passed through to the agents, e.g. object store credentials
    pub config_parameters: BTreeMap<String, String>,
    pub user_name: String,
    pub password: Option<String>,
    pub certs: HttpsCerts,
}

impl DatabaseOptions {
    pub fn validate_db_name(&self) -> Result<(), ValidationError> {
        validate_db_name(&self.db_name, "database")
    }

    /// Basic auth for the database service, when a password was given
    pub fn credentials(&self) -> Option<Credentials> {
        self.password
            .as_ref()
            .map(|password| Credentials::new(self.user_name.clone(), password.clone()))
    }

    pub async fn resolve_hosts(&mut self) -> Result<(), WorkflowError> {
        self.hosts = resolve_hosts(&self.raw_hosts, self.ipv6).await?;
        Ok(())
    }
}

/// Resolve host names to addresses of the wanted family
///
/// Literal addresses and `ip:port` pairs are kept as they are.
pub async fn resolve_hosts(raw_hosts: &[String], ipv6: bool) -> Result<Vec<String>, WorkflowError> {
    let mut hosts = Vec::with_capacity(raw_hosts.len());

    for raw in raw_hosts {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WorkflowError::Resolve {
                host: raw.to_string(),
                reason: "empty host name".to_string(),
            });
        }

        if raw.parse::<IpAddr>().is_ok() || raw.parse::<SocketAddr>().is_ok() {
            hosts.push(raw.to_string());
            continue;
        }

        let addresses = tokio::net::lookup_host((raw, 0))
            .await
            .map_err(|e| WorkflowError::Resolve {
                host: raw.to_string(),
                reason: e.to_string(),
            })?;

        let address = addresses
            .map(|addr| addr.ip())
            .find(|ip| ip.is_ipv6() == ipv6)
            .ok_or_else(|| WorkflowError::Resolve {
                host: raw.to_string(),
                reason: format!("no {} address", if ipv6 { "IPv6" } else { "IPv4" }),
            })?;
        hosts.push(address.to_string());
    }

    Ok(hosts)
}
