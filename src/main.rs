use anyhow::Result;
use clap::Parser;

mod cli;

use cli::commands::import::ImportCommand;
use cli::commands::list::ListCommand;
use cli::commands::scan::ScanCommand;
use cli::commands::status::{ReassignCommand, SetStatusCommand};
use cli::commands::{Command, Session};
use cli::{Cli, Commands};
use picking_control::{init_telemetry, shutdown_telemetry, workflow_metrics, PickingControlConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    PickingControlConfig::load_env_file()?;
    let config = PickingControlConfig::load_from(&cli.config)?;
    init_telemetry(&config.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async {
        let session = Session::open(&config, cli.user.clone(), cli.role, cli.json).await?;
        let outcome = run(&cli.command, &session).await;
        session.close().await;
        outcome
    });

    if config.observability.metrics_enabled {
        workflow_metrics().log_stats();
    }
    shutdown_telemetry();
    result
}

async fn run(command: &Commands, session: &Session) -> Result<()> {
    match command {
        Commands::List {
            statuses,
            operators,
            search,
        } => {
            ListCommand {
                statuses: statuses.clone(),
                operators: operators.clone(),
                search: search.clone(),
            }
            .execute(session)
            .await
        }
        Commands::Import { file } => ImportCommand { file: file.clone() }.execute(session).await,
        Commands::SetStatus { folio, status } => {
            SetStatusCommand {
                folio: folio.clone(),
                status: *status,
            }
            .execute(session)
            .await
        }
        Commands::Reassign { folio, operator } => {
            ReassignCommand {
                folio: folio.clone(),
                operator: operator.clone(),
            }
            .execute(session)
            .await
        }
        Commands::Scan { command } => ScanCommand { command }.execute(session).await,
    }
}
