//! # AnalysisDoc CLI (`adoc`)
//!
//! The `adoc` binary manages the document-analysis service. It provides
//! commands for database initialization and for starting the HTTP API
//! server.
//!
//! ## Usage
//!
//! ```bash
//! adoc --config ./config/adoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `adoc init` | Create the SQLite database and run schema migrations |
//! | `adoc serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! adoc init --config ./config/adoc.toml
//!
//! # Start the API server
//! adoc serve --config ./config/adoc.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use analysisdoc::{config, db, migrate, server};

#[derive(Parser)]
#[command(name = "adoc", version, about = "Document analysis service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "adoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and run schema migrations
    Init,
    /// Start the HTTP API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analysisdoc=info,adoc=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Command::Init => {
            let pool = db::connect(&config.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized at {}", config.db.path.display());
        }
        Command::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
