use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect_store, OutputFormat};
use crate::config::AppConfig;
use crate::database::Repository;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for an existing user")]
    Issue {
        #[arg(long)]
        email: String,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let users = UserService::new(Repository::new(store), config.security.clone());

    match cmd {
        TokenCommands::Issue { email } => {
            let token = users.issue_token(&email).await?;
            match output_format {
                OutputFormat::Json => output_success(
                    output_format,
                    "Token issued",
                    Some(json!({ "token": token })),
                ),
                // Bare token so it can be captured by a shell
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
