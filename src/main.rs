use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reviewhound::app::AppContext;
use reviewhound::cli::{commands, Cli, Commands};
use reviewhound::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            commands::serve(&ctx, host, port).await?;
        }
        Commands::Scrape { keyword, asin } => {
            commands::scrape(&ctx, &keyword, &asin).await?;
        }
        Commands::Login => {
            commands::login(&ctx).await?;
        }
        Commands::RepairSession => {
            commands::repair_session(&ctx)?;
        }
    }

    Ok(())
}
