use super::options::DatabaseOptions;
use super::ClusterCommands;
use crate::error::WorkflowError;
use crate::op::Instructions;
use crate::ops::{
    initiator, DownloadPurpose, HTTPSCheckRunningDBOp, NMADownloadFileOp, NMAHealthOp,
    NMALoadRemoteCatalogOp, NMANetworkProfileOp, NMAPrepareDirectoriesOp, NMAShowRestorePointsOp,
    OpType,
};
use cluster_primitives::{
    current_description_path, first_duplicate, restore_point_description_path,
    validate_communal_location, CoordinationDatabase, CoordinationNode, RealignedDatabase,
    RestorePointPolicy, ValidationError, CURRENT_DESCRIPTION_DEST_PATH,
    RESTORE_POINT_DESCRIPTION_DEST_PATH,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_LOAD_CATALOG_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct ReviveDatabaseOptions {
    pub base: DatabaseOptions,
    /// Upper bound for loading the remote catalog on each host
    pub load_catalog_timeout: Duration,
    /// Remove existing directories before reviving
    pub force_removal: bool,
    /// Only describe the database in communal storage
    pub display_only: bool,
    pub ignore_cluster_lease: bool,
    pub restore_point: RestorePointPolicy,
}

impl Default for ReviveDatabaseOptions {
    fn default() -> Self {
        Self {
            base: DatabaseOptions::default(),
            load_catalog_timeout: DEFAULT_LOAD_CATALOG_TIMEOUT,
            force_removal: false,
            display_only: false,
            ignore_cluster_lease: false,
            restore_point: RestorePointPolicy::default(),
        }
    }
}

impl ReviveDatabaseOptions {
    pub fn is_restore_enabled(&self) -> bool {
        self.restore_point.is_restore_enabled()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.validate_db_name()?;

        if self.base.raw_hosts.is_empty() && !self.display_only {
            return Err(ValidationError::MissingHosts);
        }

        validate_communal_location(&self.base.communal_storage_location)?;

        self.restore_point.validate()
    }

    /// Fill in defaults that depend on other options, then resolve hosts
    pub async fn analyze(&mut self) -> Result<(), WorkflowError> {
        // display-only with no hosts reads communal storage from here
        if self.base.raw_hosts.is_empty() && self.display_only {
            self.base.raw_hosts.push("localhost".to_string());
        }
        self.base.resolve_hosts().await?;

        // two names may resolve to one address
        if let Some(duplicate) = first_duplicate(&self.base.hosts) {
            return Err(ValidationError::DuplicateHost(duplicate.to_string()).into());
        }
        Ok(())
    }

    fn current_description_path(&self) -> String {
        current_description_path(&self.base.communal_storage_location, &self.base.db_name)
    }

    fn restore_point_description_path(&self, restore_point_id: &str) -> String {
        restore_point_description_path(
            &self.base.communal_storage_location,
            &self.base.db_name,
            &self.restore_point.archive,
            restore_point_id,
        )
    }
}

/// What a revive hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviveOutcome {
    /// Raw description file read from communal storage
    pub db_info: String,
    /// The revived topology, or the discovered one for display-only
    pub vdb: CoordinationDatabase,
}

/// Health and running checks, then the description download or, for a
/// restore, the lease check and the restore-point listing
pub fn produce_pre_revive_instructions(options: &ReviveDatabaseOptions) -> Instructions {
    let base = &options.base;
    let mut instructions: Instructions = vec![
        Box::new(NMAHealthOp::new(base.hosts.clone())),
        Box::new(HTTPSCheckRunningDBOp::new(
            base.hosts.clone(),
            None,
            OpType::ReviveDb,
        )),
    ];

    let download = |purpose| {
        NMADownloadFileOp::new(
            purpose,
            &base.hosts,
            base.db_name.clone(),
            options.current_description_path(),
            CURRENT_DESCRIPTION_DEST_PATH,
            base.config_parameters.clone(),
        )
        .ignore_cluster_lease(options.ignore_cluster_lease)
    };

    if !options.is_restore_enabled() {
        instructions.push(Box::new(
            download(DownloadPurpose::Revive).display_only(options.display_only),
        ));
        return instructions;
    }

    if !options.display_only {
        instructions.push(Box::new(download(DownloadPurpose::RestoreLeaseCheck)));
    }
    instructions.push(Box::new(NMAShowRestorePointsOp::new(
        &initiator(&base.hosts),
        base.db_name.clone(),
        base.communal_storage_location.clone(),
        base.config_parameters.clone(),
    )));
    instructions
}

/// Download the description saved with the chosen restore point
pub fn produce_restore_specific_instructions(
    options: &ReviveDatabaseOptions,
    restore_point_id: &str,
) -> Instructions {
    let base = &options.base;
    let download = NMADownloadFileOp::new(
        DownloadPurpose::Restore,
        &base.hosts,
        base.db_name.clone(),
        options.restore_point_description_path(restore_point_id),
        RESTORE_POINT_DESCRIPTION_DEST_PATH,
        base.config_parameters.clone(),
    )
    .display_only(options.display_only);

    vec![Box::new(download)]
}

/// Move the discovered topology onto the user's hosts and stamp it with
/// the revive options
pub fn revive_topology(
    options: &ReviveDatabaseOptions,
    discovered: &CoordinationDatabase,
) -> Result<RealignedDatabase, ValidationError> {
    let mut realigned = discovered.realign(&options.base.hosts)?;

    let vdb = &mut realigned.vdb;
    vdb.name = options.base.db_name.clone();
    vdb.communal_storage_location = options.base.communal_storage_location.clone();
    vdb.ipv6 = options.base.ipv6;
    vdb.is_eon = true;

    Ok(realigned)
}

/// Prepare directories, read network profiles and load the remote catalog
pub fn produce_revive_instructions(
    options: &ReviveDatabaseOptions,
    realigned: &RealignedDatabase,
) -> Instructions {
    // user storage locations are never force-removed
    let host_node_map: BTreeMap<String, CoordinationNode> = realigned
        .vdb
        .host_node_map
        .iter()
        .map(|(host, node)| {
            let node = CoordinationNode {
                storage_locations: node.system_storage_locations(),
                ..node.clone()
            };
            (host.clone(), node)
        })
        .collect();

    vec![
        Box::new(NMAPrepareDirectoriesOp::new(
            host_node_map,
            options.force_removal,
            true,
        )),
        Box::new(NMANetworkProfileOp::new(options.base.hosts.clone())),
        Box::new(NMALoadRemoteCatalogOp::new(
            realigned.old_hosts.clone(),
            options.base.config_parameters.clone(),
            realigned.vdb.clone(),
            options.load_catalog_timeout,
            options.restore_point.clone(),
        )),
    ]
}

impl ClusterCommands {
    /// Revive a terminated database from communal storage, optionally from
    /// a restore point
    pub async fn revive_database(
        &self,
        mut options: ReviveDatabaseOptions,
    ) -> Result<ReviveOutcome, WorkflowError> {
        options.validate()?;
        options.analyze().await?;

        let ctx = self
            .run(
                produce_pre_revive_instructions(&options),
                "fail to collect the information of database in revive_db",
            )
            .await?;
        let (mut db_info, mut discovered) = (ctx.db_info, ctx.vdb);

        if options.is_restore_enabled() {
            let points = ctx.restore_points.unwrap_or_default();
            let restore_point_id = options.restore_point.resolve(&points)?;
            info!("restoring from restore point {}", restore_point_id);

            let ctx = self
                .run(
                    produce_restore_specific_instructions(&options, &restore_point_id),
                    "fail to collect the restore-specific information of database in revive_db",
                )
                .await?;
            db_info = ctx.db_info;
            discovered = ctx.vdb;
        }

        let db_info = db_info.unwrap_or_default();

        if options.display_only {
            return Ok(ReviveOutcome {
                db_info,
                vdb: discovered.unwrap_or_default(),
            });
        }

        let discovered = discovered.ok_or_else(|| {
            ValidationError::Other("no database description was found in communal storage".to_string())
        })?;
        let realigned = revive_topology(&options, &discovered)?;

        self.run(
            produce_revive_instructions(&options, &realigned),
            "fail to revive database",
        )
        .await?;

        Ok(ReviveOutcome {
            db_info,
            vdb: realigned.vdb,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, Reply};
    use assert_matches::assert_matches;
    use chrono::{Duration as Lease, Utc};
    use cluster_primitives::{RestorePointError, RestorePointSelector};
    use serde_json::json;
    use std::sync::Arc;

    const COMMUNAL: &str = "s3://bucket/test_db";

    fn description(nodes: &[(&str, &str)]) -> String {
        let nodes: Vec<_> = nodes
            .iter()
            .map(|(name, address)| {
                json!({
                    "name": name,
                    "address": address,
                    "catalog_path": format!("/data/test_db/{}_catalog", name),
                    "storage_locations": [format!("/data/test_db/{}_data", name), "/home/user_loc"],
                    "user_storage_locations": ["/home/user_loc"]
                })
            })
            .collect();
        json!({
            "database": { "name": "test_db" },
            "nodes": nodes,
            "cluster_lease_expiration": (Utc::now() - Lease::hours(1)).to_rfc3339()
        })
        .to_string()
    }

    fn three_nodes() -> String {
        description(&[
            ("v_test_db_node0003", "192.168.1.103"),
            ("v_test_db_node0001", "192.168.1.101"),
            ("v_test_db_node0002", "192.168.1.102"),
        ])
    }

    fn cluster(description: &str) -> FakeTransport {
        FakeTransport::new()
            .on("v1/health", Reply::json(r#"{"healthy": "true"}"#))
            .on(
                "v1/vertica/download-file",
                Reply::json(json!({ "file_content": description }).to_string()),
            )
            .on("v1/directories/prepare", Reply::json(r#"{"return_code": 0}"#))
            .on(
                "v1/network-profiles",
                Reply::json(r#"{"name": "eth0", "address": "10.1.10.1", "broadcast": "10.1.10.255"}"#),
            )
            .on("v1/catalog/revive", Reply::json("{}"))
    }

    fn options(hosts: &[&str]) -> ReviveDatabaseOptions {
        ReviveDatabaseOptions {
            base: DatabaseOptions {
                db_name: "test_db".to_string(),
                raw_hosts: hosts.iter().map(|h| h.to_string()).collect(),
                communal_storage_location: COMMUNAL.to_string(),
                ..DatabaseOptions::default()
            },
            ..ReviveDatabaseOptions::default()
        }
    }

    #[tokio::test]
    async fn revive_runs_every_stage_in_order() {
        let fake = Arc::new(cluster(&three_nodes()));
        let commands = ClusterCommands::new(fake.clone());

        let outcome = commands
            .revive_database(options(&["10.1.10.2", "10.1.10.1", "10.1.10.3"]))
            .await
            .unwrap();

        assert_eq!(
            fake.stages(),
            vec![
                "v1/health",
                "v1/nodes",
                "v1/vertica/download-file",
                "v1/directories/prepare",
                "v1/network-profiles",
                "v1/catalog/revive",
            ]
        );

        let download = &fake.calls_to("v1/vertica/download-file")[0];
        assert_eq!(download.host, "10.1.10.2");
        assert_eq!(
            download.json_body()["source_file_path"],
            "s3://bucket/test_db/metadata/test_db/cluster_config.json"
        );
        assert_eq!(download.json_body()["destination_file_path"], "/tmp/desc.json");

        let loads = fake.calls_to("v1/catalog/revive");
        let old_host_for = |host: &str| {
            loads.iter().find(|c| c.host == host).unwrap().json_body()["host"].clone()
        };
        assert_eq!(old_host_for("10.1.10.2"), "192.168.1.101");
        assert_eq!(old_host_for("10.1.10.1"), "192.168.1.102");
        assert_eq!(old_host_for("10.1.10.3"), "192.168.1.103");
        assert!(loads.iter().all(|c| c.timeout == Some(DEFAULT_LOAD_CATALOG_TIMEOUT)));

        let prepare = fake.calls_to("v1/directories/prepare");
        let locations = prepare[0].json_body()["storage_locations"].clone();
        assert_eq!(locations.as_array().map(Vec::len), Some(1));

        let vdb = outcome.vdb;
        assert_eq!(vdb.name, "test_db");
        assert_eq!(vdb.communal_storage_location, COMMUNAL);
        assert!(vdb.is_eon);
        assert_eq!(vdb.host_list, vec!["10.1.10.2", "10.1.10.1", "10.1.10.3"]);
        assert_eq!(vdb.host_node_map["10.1.10.1"].name, "v_test_db_node0002");
        assert!(outcome.db_info.contains("v_test_db_node0001"));
    }

    #[tokio::test]
    async fn restore_by_index_downloads_that_restore_points_description() {
        let points = json!([
            { "archive": "nightly", "index": 1, "id": "id-one" },
            { "archive": "nightly", "index": 2, "id": "id-two" },
            { "archive": "nightly", "index": 3, "id": "id-three" },
            { "archive": "weekly", "index": 2, "id": "id-weekly" }
        ]);
        let fake = Arc::new(
            cluster(&three_nodes()).on("v1/restore-points", Reply::json(points.to_string())),
        );
        let commands = ClusterCommands::new(fake.clone());
        let mut options = options(&["10.1.10.1", "10.1.10.2", "10.1.10.3"]);
        options.restore_point = RestorePointPolicy::by_index("nightly", 2);

        commands.revive_database(options).await.unwrap();

        assert_eq!(
            fake.stages(),
            vec![
                "v1/health",
                "v1/nodes",
                "v1/vertica/download-file",
                "v1/restore-points",
                "v1/vertica/download-file",
                "v1/directories/prepare",
                "v1/network-profiles",
                "v1/catalog/revive",
            ]
        );
        let downloads = fake.calls_to("v1/vertica/download-file");
        assert_eq!(
            downloads[1].json_body()["source_file_path"],
            "s3://bucket/test_db/metadata/test_db/archives/nightly/id-two/cluster_config.json"
        );
        assert_eq!(downloads[1].json_body()["destination_file_path"], "/tmp/restore_point_desc.json");
        let load = &fake.calls_to("v1/catalog/revive")[0];
        assert_eq!(load.json_body()["restore_point_index"], 2);
    }

    #[tokio::test]
    async fn unknown_restore_point_stops_before_restore_download() {
        let points = json!([{ "archive": "nightly", "index": 1, "id": "id-one" }]);
        let fake = Arc::new(
            cluster(&three_nodes()).on("v1/restore-points", Reply::json(points.to_string())),
        );
        let commands = ClusterCommands::new(fake.clone());
        let mut options = options(&["10.1.10.1", "10.1.10.2", "10.1.10.3"]);
        options.restore_point = RestorePointPolicy::by_id("nightly", "missing");

        let err = commands.revive_database(options).await.unwrap_err();

        let not_found = assert_matches!(
            err,
            WorkflowError::RestorePoint(RestorePointError::NotFound(not_found)) => not_found
        );
        assert_eq!(not_found.archive, "nightly");
        assert_eq!(not_found.selector, RestorePointSelector::Id("missing".to_string()));
        assert_eq!(fake.calls_to("v1/vertica/download-file").len(), 1);
        assert!(fake.calls_to("v1/directories/prepare").is_empty());
    }

    #[tokio::test]
    async fn display_only_stops_after_describing() {
        let content = three_nodes();
        let fake = Arc::new(cluster(&content));
        let commands = ClusterCommands::new(fake.clone());
        let mut options = options(&["10.1.10.1"]);
        options.display_only = true;

        let outcome = commands.revive_database(options).await.unwrap();

        assert_eq!(outcome.db_info, content);
        assert_eq!(outcome.vdb.node_count(), 3);
        assert!(fake.calls_to("v1/directories/prepare").is_empty());
    }

    #[tokio::test]
    async fn display_only_without_hosts_uses_localhost() {
        let fake = Arc::new(cluster(&three_nodes()));
        let commands = ClusterCommands::new(fake.clone());
        let mut options = options(&[]);
        options.display_only = true;

        commands.revive_database(options).await.unwrap();

        assert_eq!(fake.calls_to("v1/health")[0].host, "127.0.0.1");
    }

    #[tokio::test]
    async fn host_count_mismatch_fails_before_mutating_anything() {
        let fake = Arc::new(cluster(&three_nodes()));
        let commands = ClusterCommands::new(fake.clone());

        let err = commands
            .revive_database(options(&["10.1.10.1", "10.1.10.2"]))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            WorkflowError::Validation(ValidationError::HostCountMismatch { hosts: 2, nodes: 3 })
        );
        assert!(fake.calls_to("v1/directories/prepare").is_empty());
        assert!(fake.calls_to("v1/catalog/revive").is_empty());
    }

    #[tokio::test]
    async fn running_database_is_reported_with_its_stage() {
        let fake = Arc::new(cluster(&three_nodes()).on("v1/nodes", Reply::json(r#"{"node_list": []}"#)));
        let commands = ClusterCommands::new(fake.clone());

        let err = commands
            .revive_database(options(&["10.1.10.1", "10.1.10.2", "10.1.10.3"]))
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some("HTTPSCheckRunningDBOp"));
        assert!(err
            .to_string()
            .starts_with("fail to collect the information of database in revive_db: stage HTTPSCheckRunningDBOp failed"));
        assert!(fake.calls_to("v1/vertica/download-file").is_empty());
    }

    #[tokio::test]
    async fn duplicate_hosts_fail_before_network_calls() {
        let fake = Arc::new(cluster(&three_nodes()));
        let commands = ClusterCommands::new(fake.clone());

        let err = commands
            .revive_database(options(&["10.1.10.1", "10.1.10.2", " 10.1.10.1"]))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            WorkflowError::Validation(ValidationError::DuplicateHost(host)) if host == "10.1.10.1"
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_hosts_fail_validation_without_network_calls() {
        let fake = Arc::new(cluster(&three_nodes()));
        let commands = ClusterCommands::new(fake.clone());

        let err = commands.revive_database(options(&[])).await.unwrap_err();

        assert_matches!(err, WorkflowError::Validation(ValidationError::MissingHosts));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn restore_without_display_only_checks_the_lease_first() {
        let mut options = options(&[]);
        options.base.hosts = vec!["10.1.10.1".to_string(), "10.1.10.2".to_string()];
        options.restore_point = RestorePointPolicy::by_id("nightly", "abc");

        let names: Vec<_> = produce_pre_revive_instructions(&options)
            .iter()
            .map(|op| op.description().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "Check agent health",
                "Check that no database is running",
                "Check the cluster lease",
                "List restore points",
            ]
        );

        options.display_only = true;
        assert_eq!(produce_pre_revive_instructions(&options).len(), 3);
    }

    #[test]
    fn both_restore_selectors_are_rejected() {
        let mut options = options(&["10.1.10.1"]);
        options.restore_point = RestorePointPolicy {
            archive: "nightly".to_string(),
            index: Some(1),
            id: Some("abc".to_string()),
        };

        assert_eq!(options.validate(), Err(ValidationError::RestorePointSelector));
    }
}
