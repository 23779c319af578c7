//! ShopWave CLI - gateway administration tools.
//!
//! # Usage
//!
//! ```bash
//! # Promote an account to admin
//! sw-cli role set --user-id 6f1c... --role admin
//!
//! # Insert catalog items from a YAML file
//! sw-cli seed catalog.yaml
//!
//! # Print the SQL schema to apply on the gateway project
//! sw-cli schema > schema.sql
//! ```
//!
//! `role` and `seed` need `SHOPWAVE_GATEWAY_URL`, `SHOPWAVE_GATEWAY_ANON_KEY`
//! and `SHOPWAVE_GATEWAY_SERVICE_KEY`. Both run with the service-role key, so
//! row-level security does not apply to them.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shopwave_core::{Role, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(author, version, about = "ShopWave CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage account roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Insert catalog items from a YAML file
    Seed {
        /// Path to the YAML file
        file: PathBuf,
    },
    /// Print the gateway SQL schema (tables, policies, triggers)
    Schema,
}

#[derive(Subcommand)]
enum RoleAction {
    /// Set the role on an account's profile
    Set {
        /// Gateway auth user id
        #[arg(short, long)]
        user_id: String,

        /// Role to assign (`user`, `admin`)
        #[arg(short, long)]
        role: Role,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Role { action } => match action {
            RoleAction::Set { user_id, role } => {
                let gateway = commands::service_gateway()?;
                commands::role::set(&gateway, &UserId::new(user_id), role).await?;
            }
        },
        Commands::Seed { file } => {
            let drafts = commands::seed::load(&file).await?;
            let gateway = commands::service_gateway()?;
            commands::seed::insert(&gateway, &drafts).await?;
        }
        Commands::Schema => commands::schema::print()?,
    }
    Ok(())
}
