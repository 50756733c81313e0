use anyhow::Context;
use clap::Parser;
use tracing::info;

mod admin;
mod cli;
mod pipeline;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cakeday=info,cakeday_scheduler=info,cakeday_store=info,cakeday_notify=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > CAKEDAY_CONFIG env > ~/.cakeday/cakeday.toml
    let config = cakeday_core::CakedayConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    // one SQLite file, one connection handle shared by every component
    let db_path = &config.database.path;
    ensure_parent_dir(db_path)?;
    let db = cakeday_store::Database::open(db_path)
        .with_context(|| format!("failed to open database {db_path}"))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(version = env!("CARGO_PKG_VERSION"), "cakeday starting");
            pipeline::serve(&config, &db).await
        }
        Command::RunOnce { date, days } => pipeline::run_once(&config, &db, date, days).await,
        Command::Upcoming { date, days } => {
            admin::upcoming(&db, pipeline::window_for(&config, date, days))
        }
        Command::Employee { action } => admin::employee(&db, action),
        Command::User { action } => admin::user(&db, action),
        Command::Subscribe { user, employee } => admin::subscribe(&db, user, employee),
        Command::Unsubscribe { id } => admin::unsubscribe(&db, id),
        Command::Subscriptions { json } => admin::subscriptions(&db, json),
        Command::Subscribers { employee } => admin::subscribers(&db, employee),
    }
}

fn ensure_parent_dir(path: &str) -> anyhow::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}
