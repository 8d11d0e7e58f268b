pub mod commands;
pub mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::app::AppState;
use crate::auth::SystemClock;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "feria")]
#[command(about = "Feria CLI - operator tooling for the Feria Puno backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Database maintenance")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Inspect the permission catalog")]
    Permissions {
        #[command(subcommand)]
        cmd: commands::permissions::PermissionCommands,
    },

    #[command(about = "Issue, revoke and inspect delegated access tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Same wiring as the server, minus the listener. Reads `.env` and the
/// process environment.
pub fn load_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    let database = DatabaseManager::connect_lazy(&config.database)?;
    Ok(AppState::new(config, database, Arc::new(SystemClock)))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let state = load_state()?;

    let result = match cli.command {
        Commands::Db { cmd } => commands::db::handle(cmd, &state, output_format).await,
        Commands::Permissions { cmd } => commands::permissions::handle(cmd, &state, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, &state, output_format).await,
    };

    state.database.close().await;
    result
}
