// src/main.rs — Timesheet bot entry point

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use timesheet_bot::bot::connector::BotFrameworkClient;
use timesheet_bot::cli::{employees, migrate, Cli, Commands};
use timesheet_bot::infra::config::Config;
use timesheet_bot::infra::daemon::{run_daemon, AppContext};
use timesheet_bot::infra::logger;
use timesheet_bot::store::{spawn_store_server, Store};

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(Path::new(path))?
    } else {
        Config::load()?
    };
    config.validate()?;

    let db_path = config.database.resolved_path();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate { status, rollback } => migrate::run_migrate(&db_path, status, rollback),
        Commands::Employees { action } => {
            let store = Store::open(&db_path)?;
            employees::run_employees(&store, action)
        }
        Commands::Serve => {
            let ctx = build_context(config, &db_path)?;
            run_daemon(ctx).await
        }
        Commands::Remind => {
            let ctx = build_context(config, &db_path)?;
            let report = ctx
                .reminders()
                .run(chrono::Local::now().date_naive())
                .await?;
            println!(
                "Reminders: {} delivered, {} skipped, {} failed",
                report.delivered, report.skipped, report.failed
            );
            Ok(())
        }
    }
}

fn build_context(config: Config, db_path: &Path) -> anyhow::Result<AppContext> {
    let store = Store::open(db_path)?;
    tracing::info!("Database: {}", db_path.display());
    let (store, _join) = spawn_store_server(store, config.database.call_timeout());
    let connector = Arc::new(BotFrameworkClient::new(&config.bot)?);
    Ok(AppContext::new(config, store, connector))
}
