use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::{connect_store, OutputFormat};
use crate::config::AppConfig;
use crate::database::Repository;
use crate::services::{RegisterRequest, UserService};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "SHOPCTL_PASSWORD", help = "Password (or set SHOPCTL_PASSWORD)")]
        password: String,
        #[arg(long)]
        phone: String,
        #[arg(long, help = "Grant admin rights")]
        admin: bool,
    },
}

pub async fn handle(cmd: UserCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let users = UserService::new(Repository::new(store), config.security.clone());

    match cmd {
        UserCommands::Create {
            email,
            name,
            password,
            phone,
            admin,
        } => {
            let user = users
                .register(RegisterRequest {
                    email: Some(email),
                    name: Some(name),
                    password: Some(password),
                    phone: Some(phone),
                    is_admin: Some(admin),
                })
                .await?;

            output_success(
                output_format,
                &format!("Created user {} ({})", user.email, user.id),
                Some(serde_json::to_value(&user)?),
            )
        }
    }
}
