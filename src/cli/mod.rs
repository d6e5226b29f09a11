pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, EntityStore, PgEntityStore};

#[derive(Parser)]
#[command(name = "shopctl")]
#[command(about = "Administration commands for the storefront admin API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the documents table and its indexes")]
    Migrate,

    #[command(about = "User account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Issue bearer tokens")]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Migrate => commands::migrate::handle(&config, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &config, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, &config, output_format).await,
    }
}

/// Entity store on the configured database, schema ensured.
pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn EntityStore>> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::ensure_schema(&pool).await?;
    Ok(Arc::new(PgEntityStore::new(pool)))
}
