//! adoption-db - Main entry point.
//!
//! Applies and reverts the pet adoption schema and reports connection pool
//! health for operators.

use adoption_db::config::{Command, Config};
use adoption_db::db::DatabaseManager;
use adoption_db::migrations::MigrationReport;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

fn print_report(report: &MigrationReport) -> Result<bool, Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(report.is_success())
}

async fn run(manager: &DatabaseManager, command: Command) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Command::Migrate => print_report(&manager.migrate().await?),
        Command::Rollback => print_report(&manager.rollback().await?),
        Command::MigrateTest => print_report(&manager.migrate_for_test().await?),
        Command::RollbackTest => print_report(&manager.rollback_for_test().await?),
        Command::Status => {
            let server = manager.execute("SELECT version() AS server_version", &[]).await?;
            if let Some(version) = server.scalar("serverVersion") {
                info!(server_version = %version, "Database reachable");
            }
            println!("{}", serde_json::to_string_pretty(&manager.pool_status())?);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    init_tracing(&config);

    let command = config.command.unwrap_or(Command::Status);
    info!(
        command = ?command,
        database = %config.masked_connection_url(),
        "Starting adoption-db v{}",
        env!("CARGO_PKG_VERSION")
    );

    let manager = match DatabaseManager::new(&config) {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::select! {
        result = run(&manager, command) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; shutting down");
            Ok(false)
        }
    };

    manager.end_pool().await;

    match outcome {
        Ok(true) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}
