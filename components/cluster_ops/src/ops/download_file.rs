use super::initiator;
use crate::context::ExecContext;
use crate::error::{HostErrorKind, Result};
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use chrono::{DateTime, Utc};
use cluster_primitives::{CoordinationDatabase, CoordinationNode, CATALOG_PATH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Why a description file is being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPurpose {
    /// Read the current description to revive from it
    Revive,
    /// Only make sure no other cluster holds the communal storage
    RestoreLeaseCheck,
    /// Read the description saved with a restore point
    Restore,
}

#[derive(Debug, Clone, Serialize)]
struct DownloadFileRequest {
    source_file_path: String,
    destination_file_path: String,
    catalog_path: String,
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DownloadFileResponse {
    file_content: String,
}

#[derive(Debug, Deserialize)]
struct DescribedDatabase {
    name: String,
}

/// Layout of the description file kept in communal storage
#[derive(Debug, Deserialize)]
struct ClusterDescription {
    database: DescribedDatabase,
    #[serde(default)]
    nodes: Vec<CoordinationNode>,
    #[serde(default)]
    cluster_lease_expiration: String,
}

impl ClusterDescription {
    fn into_database(self) -> CoordinationDatabase {
        let mut vdb = CoordinationDatabase::new(self.database.name);
        vdb.is_eon = true;
        for node in self.nodes {
            vdb.add_node(node);
        }
        vdb
    }
}

/// Downloads a description file from communal storage on the initiator
/// and turns it into a topology
pub struct NMADownloadFileOp {
    base: OpBase,
    purpose: DownloadPurpose,
    db_name: String,
    request: DownloadFileRequest,
    display_only: bool,
    ignore_cluster_lease: bool,
}

impl NMADownloadFileOp {
    pub fn new(
        purpose: DownloadPurpose,
        hosts: &[String],
        db_name: impl Into<String>,
        source_file_path: impl Into<String>,
        destination_file_path: impl Into<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        let description = match purpose {
            DownloadPurpose::Revive => "Download the database description",
            DownloadPurpose::RestoreLeaseCheck => "Check the cluster lease",
            DownloadPurpose::Restore => "Download the restore point description",
        };

        Self {
            base: OpBase::new("NMADownloadFileOp", description, initiator(hosts)),
            purpose,
            db_name: db_name.into(),
            request: DownloadFileRequest {
                source_file_path: source_file_path.into(),
                destination_file_path: destination_file_path.into(),
                catalog_path: CATALOG_PATH.to_string(),
                parameters,
            },
            display_only: false,
            ignore_cluster_lease: false,
        }
    }

    /// Keep whatever was downloaded and skip every check on it
    pub fn display_only(mut self, display_only: bool) -> Self {
        self.display_only = display_only;
        self
    }

    pub fn ignore_cluster_lease(mut self, ignore: bool) -> Self {
        self.ignore_cluster_lease = ignore;
        self
    }

    fn checks_lease(&self) -> bool {
        self.purpose != DownloadPurpose::Restore && !self.ignore_cluster_lease && !self.display_only
    }

    fn read_description(
        &self,
        content: &str,
    ) -> std::result::Result<Option<ClusterDescription>, HostErrorKind> {
        let description: ClusterDescription = match serde_json::from_str(content) {
            Ok(description) => description,
            Err(e) if self.display_only => {
                warn!("[{}] description file is not readable: {}", self.base.name(), e);
                return Ok(None);
            }
            Err(e) => {
                return Err(HostErrorKind::Decode(format!(
                    "description file is not valid: {}",
                    e
                )))
            }
        };

        if self.display_only {
            return Ok(Some(description));
        }

        if description.database.name != self.db_name {
            return Err(HostErrorKind::Rejected(format!(
                "database {} does not match the database {} in the description file",
                self.db_name, description.database.name
            )));
        }

        if self.checks_lease() {
            check_cluster_lease(&description.cluster_lease_expiration, Utc::now())?;
        }

        Ok(Some(description))
    }
}

/// Fails while another cluster's lease on the communal storage is live
fn check_cluster_lease(
    expiration: &str,
    now: DateTime<Utc>,
) -> std::result::Result<(), HostErrorKind> {
    if expiration.is_empty() {
        return Ok(());
    }

    let expires = DateTime::parse_from_rfc3339(expiration)
        .map_err(|e| HostErrorKind::Decode(format!("bad cluster lease expiration {:?}: {}", expiration, e)))?
        .with_timezone(&Utc);

    if expires > now {
        return Err(HostErrorKind::Rejected(format!(
            "communal storage is in use by a running cluster whose lease expires at {}; \
             wait for it to expire or ignore the cluster lease",
            expires.to_rfc3339()
        )));
    }
    Ok(())
}

impl ClusterOp for NMADownloadFileOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let request = HostRequest::agent(HttpMethod::Post, "v1/vertica/download-file");
        let request = self.base.json_request(request, &self.request)?;
        self.base.set_request_for_all(request);
        Ok(())
    }

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut downloaded = None;

        self.base.collect_results(|_, result| {
            let response: DownloadFileResponse = result.decode()?;
            let description = self.read_description(&response.file_content)?;
            downloaded = Some((response.file_content, description));
            Ok(())
        })?;

        let Some((content, description)) = downloaded else {
            return Err(self.base.missing_context("no host to download the description file from"));
        };

        if self.purpose == DownloadPurpose::RestoreLeaseCheck {
            info!("[{}] cluster lease is free", self.base.name());
            return Ok(());
        }

        ctx.db_info = Some(content);
        if let Some(description) = description {
            ctx.vdb = Some(description.into_database());
        }
        Ok(())
    }
}
