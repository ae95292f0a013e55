pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reviewhound")]
#[command(about = "Collects competitor descriptions and reviews for a product", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/reviewhound/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind, overriding the config
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overriding the config
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Scrape once and print the JSON response
    Scrape {
        /// Search keyword used to discover competitors
        keyword: String,
        /// The product's own identifier, excluded from competitors
        asin: String,
    },
    /// Open a browser window to sign in and save the session cookies
    Login,
    /// Normalize same-site values in the saved cookies file
    RepairSession,
}
