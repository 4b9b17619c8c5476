// bases/vcluster_ctl/src/config.rs
use clap::{Args, Parser, Subcommand};
use cluster_ops::ops::SetConfigurationParameter;
use cluster_ops::workflows::{
    DatabaseOptions, ReviveDatabaseOptions, SetConfigurationParameterOptions,
    StartDatabaseOptions, StartNodesOptions,
};
use cluster_ops::{HttpsCerts, Scheme, TransportConfig, DEFAULT_AGENT_PORT, DEFAULT_DATABASE_PORT};
use cluster_primitives::RestorePointPolicy;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database cluster administration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Node management agent port
    #[arg(long, global = true, default_value_t = DEFAULT_AGENT_PORT)]
    pub agent_port: u16,

    /// Database HTTPS service port
    #[arg(long, global = true, default_value_t = DEFAULT_DATABASE_PORT)]
    pub db_port: u16,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 300)]
    pub request_timeout: u64,

    /// Talk plain HTTP instead of HTTPS (test agents only)
    #[arg(long, global = true)]
    pub insecure_http: bool,

    /// PEM private key for mutual TLS
    #[arg(long, global = true)]
    pub key_file: Option<PathBuf>,

    /// PEM certificate for mutual TLS
    #[arg(long, global = true)]
    pub cert_file: Option<PathBuf>,

    /// PEM CA certificate to verify the agents with
    #[arg(long, global = true)]
    pub ca_cert_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database name
    #[arg(short = 'd', long = "db-name")]
    pub db_name: String,

    /// Comma-separated hosts
    #[arg(long, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Resolve host names to IPv6 addresses
    #[arg(long)]
    pub ipv6: bool,

    /// Database user
    #[arg(long, default_value = "dbadmin")]
    pub user: String,

    #[arg(long)]
    pub password: Option<String>,

    /// Extra parameters passed to the agents, as key=value
    #[arg(long = "config-param", value_parser = parse_key_value)]
    pub config_params: Vec<(String, String)>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Revive a terminated database from communal storage
    ReviveDb {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Communal storage location, e.g. s3://bucket/path
        #[arg(long)]
        communal_storage_location: String,

        /// Seconds allowed for loading the remote catalog
        #[arg(long, default_value_t = 3600)]
        load_catalog_timeout: u64,

        /// Remove existing directories before reviving
        #[arg(long)]
        force_removal: bool,

        /// Describe the database in communal storage and exit
        #[arg(long)]
        display_only: bool,

        /// Revive even if another cluster holds the lease
        #[arg(long)]
        ignore_cluster_lease: bool,

        /// Restore archive to revive from
        #[arg(long)]
        restore_point_archive: Option<String>,

        /// 1-based index of the restore point in the archive
        #[arg(long, conflicts_with = "restore_point_id")]
        restore_point_index: Option<u32>,

        /// Identifier of the restore point in the archive
        #[arg(long)]
        restore_point_id: Option<String>,
    },

    /// Set or clear a configuration parameter
    SetConfig {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Sandbox to set the parameter in, the main cluster by default
        #[arg(long, default_value = "")]
        sandbox: String,

        #[arg(long)]
        parameter: String,

        /// New value; "null" clears the parameter
        #[arg(long)]
        value: String,

        /// Level, e.g. node or session; database level by default
        #[arg(long, default_value = "")]
        level: String,
    },

    /// Start a stopped database
    StartDb {
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Start DOWN nodes of a running database
    StartNodes {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Node names to start; all DOWN nodes when omitted
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
    },
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// What to run, with fully built options
#[derive(Debug, Clone)]
pub enum Action {
    ReviveDb(ReviveDatabaseOptions),
    SetConfig(SetConfigurationParameterOptions),
    StartDb(StartDatabaseOptions),
    StartNodes(StartNodesOptions),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    pub certs: HttpsCerts,
    pub action: Action,
}

impl Config {
    /// Build configuration from CLI arguments, reading any certificate files
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let transport = TransportConfig {
            scheme: if args.insecure_http {
                Scheme::Http
            } else {
                Scheme::Https
            },
            agent_port: args.agent_port,
            database_port: args.db_port,
            request_timeout: Duration::from_secs(args.request_timeout),
        };

        let certs = HttpsCerts {
            key: read_optional(args.key_file.as_deref())?,
            cert: read_optional(args.cert_file.as_deref())?,
            ca_cert: read_optional(args.ca_cert_file.as_deref())?,
        };

        let action = match args.command {
            Command::ReviveDb {
                db,
                communal_storage_location,
                load_catalog_timeout,
                force_removal,
                display_only,
                ignore_cluster_lease,
                restore_point_archive,
                restore_point_index,
                restore_point_id,
            } => {
                let mut base = database_options(db, &certs);
                base.communal_storage_location = communal_storage_location;
                Action::ReviveDb(ReviveDatabaseOptions {
                    base,
                    load_catalog_timeout: Duration::from_secs(load_catalog_timeout),
                    force_removal,
                    display_only,
                    ignore_cluster_lease,
                    restore_point: RestorePointPolicy {
                        archive: restore_point_archive.unwrap_or_default(),
                        index: restore_point_index,
                        id: restore_point_id,
                    },
                })
            }
            Command::SetConfig {
                db,
                sandbox,
                parameter,
                value,
                level,
            } => Action::SetConfig(SetConfigurationParameterOptions {
                base: database_options(db, &certs),
                change: SetConfigurationParameter {
                    sandbox,
                    parameter,
                    value,
                    level,
                },
            }),
            Command::StartDb { db } => Action::StartDb(StartDatabaseOptions {
                base: database_options(db, &certs),
            }),
            Command::StartNodes { db, nodes } => Action::StartNodes(StartNodesOptions {
                base: database_options(db, &certs),
                nodes,
            }),
        };

        Ok(Self {
            transport,
            certs,
            action,
        })
    }
}

fn database_options(args: DatabaseArgs, certs: &HttpsCerts) -> DatabaseOptions {
    DatabaseOptions {
        db_name: args.db_name,
        raw_hosts: args.hosts,
        ipv6: args.ipv6,
        config_parameters: args.config_params.into_iter().collect::<BTreeMap<_, _>>(),
        user_name: args.user,
        password: args.password,
        certs: certs.clone(),
        ..DatabaseOptions::default()
    }
}

fn read_optional(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => Ok(String::new()),
    }
}
