//! Transport seam between the dispatcher and the network

use crate::error::{HostErrorKind, TransportError};
use crate::request::{HostRequest, HttpMethod, Service};
use crate::result::HostResult;
use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_AGENT_PORT: u16 = 5554;
pub const DEFAULT_DATABASE_PORT: u16 = 8443;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Sends one request to one host
///
/// Implementations never fail: every problem is reported inside the
/// returned [`HostResult`].
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, host: &'a str, request: &'a HostRequest) -> BoxFuture<'a, HostResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub scheme: Scheme,
    pub agent_port: u16,
    pub database_port: u16,
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            agent_port: DEFAULT_AGENT_PORT,
            database_port: DEFAULT_DATABASE_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Base URL for `host`; an explicit `ip:port` host keeps its own port
    pub fn base_url(&self, host: &str, service: Service) -> String {
        let port = match service {
            Service::Agent => self.agent_port,
            Service::Database => self.database_port,
        };

        let authority = if host.parse::<SocketAddr>().is_ok() {
            host.to_string()
        } else if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };

        format!("{}://{}", self.scheme.as_str(), authority)
    }

    pub fn url(&self, host: &str, request: &HostRequest) -> String {
        format!(
            "{}/{}",
            self.base_url(host, request.service),
            request.path.trim_start_matches('/')
        )
    }
}

/// PEM encoded TLS material for mutual TLS
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HttpsCerts {
    pub key: String,
    pub cert: String,
    pub ca_cert: String,
}

impl HttpsCerts {
    pub fn has_client_identity(&self) -> bool {
        !self.key.is_empty() && !self.cert.is_empty()
    }
}

impl fmt::Debug for HttpsCerts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpsCerts")
            .field("key", &if self.key.is_empty() { "" } else { "******" })
            .field("cert", &!self.cert.is_empty())
            .field("ca_cert", &!self.ca_cert.is_empty())
            .finish()
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// reqwest backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig, certs: &HttpsCerts) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();

        if certs.has_client_identity() {
            let pem = format!("{}\n{}", certs.cert, certs.key);
            let identity =
                reqwest::Identity::from_pem(pem.as_bytes()).map_err(TransportError::Tls)?;
            builder = builder.identity(identity);
        }

        if certs.ca_cert.is_empty() {
            // agents ship with self-signed certificates
            builder = builder.danger_accept_invalid_certs(true);
        } else {
            let ca = reqwest::Certificate::from_pem(certs.ca_cert.as_bytes())
                .map_err(TransportError::Tls)?;
            builder = builder.add_root_certificate(ca);
        }

        let client = builder.build().map_err(TransportError::Client)?;

        Ok(Self { client, config })
    }

    async fn send_request(&self, host: &str, request: &HostRequest) -> HostResult {
        let url = self.config.url(host, request);
        let limit = request.timeout.unwrap_or(self.config.request_timeout);
        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .timeout(limit);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return HostResult::exception(host, HostErrorKind::Timeout(limit))
            }
            Err(e) => return HostResult::exception(host, HostErrorKind::Connection(e.to_string())),
        };

        let status = response.status();
        match response.text().await {
            Ok(content) if status.is_success() => HostResult::success(host, status.as_u16(), content),
            Ok(content) => HostResult::failure(host, status.as_u16(), content),
            Err(e) if e.is_timeout() => HostResult::exception(host, HostErrorKind::Timeout(limit)),
            Err(e) => HostResult::exception(host, HostErrorKind::Connection(e.to_string())),
        }
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, host: &'a str, request: &'a HostRequest) -> BoxFuture<'a, HostResult> {
        Box::pin(self.send_request(host, request))
    }
}
