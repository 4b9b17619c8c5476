//! Per-host request model handed to the dispatcher

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Which listener on the host a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Node management agent, reachable whether or not the database runs
    Agent,
    /// The database's own HTTPS service, only up while the node is up
    Database,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// A fully formed request for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub method: HttpMethod,
    pub service: Service,
    /// Path relative to the service root, e.g. `v1/health`
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    pub credentials: Option<Credentials>,
    /// Overrides the dispatcher's default timeout
    pub timeout: Option<Duration>,
}

impl HostRequest {
    pub fn new(method: HttpMethod, service: Service, path: impl Into<String>) -> Self {
        Self {
            method,
            service,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
            credentials: None,
            timeout: None,
        }
    }

    pub fn agent(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::new(method, Service::Agent, path)
    }

    pub fn database(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::new(method, Service::Database, path)
    }

    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> serde_json::Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
