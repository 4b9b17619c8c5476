// bases/vcluster_ctl/src/main.rs
use clap::Parser;
use cluster_ops::ClusterCommands;
use color_eyre::Result;

mod config;
mod output;

use config::{Action, Config};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = config::CliArgs::parse();
    let default_filter = if args.verbose {
        "vcluster_ctl=debug,cluster_ops=debug"
    } else {
        "vcluster_ctl=info,cluster_ops=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = Config::from_args(args)?;
    tracing::debug!("transport: {:?}", config.transport);

    let commands = ClusterCommands::over_http(config.transport, &config.certs)?;

    match config.action {
        Action::ReviveDb(options) => {
            let display_only = options.display_only;
            let outcome = commands.revive_database(options).await?;
            println!("{}", output::revive_outcome(&outcome, display_only));
        }
        Action::SetConfig(options) => {
            let parameter = options.change.parameter.clone();
            commands.set_configuration_parameter(options).await?;
            println!("Successfully set configuration parameter {}", parameter);
        }
        Action::StartDb(options) => {
            let db_name = options.base.db_name.clone();
            let hosts = commands.start_database(options).await?;
            println!("{}", output::started("database", &db_name, &hosts));
        }
        Action::StartNodes(options) => {
            let db_name = options.base.db_name.clone();
            let hosts = commands.start_nodes(options).await?;
            println!("{}", output::started("nodes of", &db_name, &hosts));
        }
    }

    Ok(())
}
