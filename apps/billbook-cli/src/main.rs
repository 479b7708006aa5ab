//! # Billbook CLI
//!
//! Command line front end for owner-scoped billing: catalogue, stock,
//! cart and invoices.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          billbook                                       │
//! │                                                                         │
//! │  args + BILLBOOK_* ──► AppConfig ──► role guard ──► command handler    │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                              billbook-db (SQLite)       │
//! │                                                          │              │
//! │  stdout ◄── JSON result ◄────────────────────────────────┘              │
//! │  stderr ◄── JSON ApiError, non-zero exit                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```bash
//! billbook owner register --business-name "Sharma General Stores" --state-code 29
//! billbook product create --name "Toor Dal 1kg" --price 150 --gst 5 --stock 10
//! billbook cart set <product-id> --qty 2
//! billbook invoice create --payment-method UPI
//! billbook invoice summary --day 2026-10-19
//! ```

mod auth;
mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use billbook_db::Database;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::cart::CartCommand;
use crate::commands::invoice::InvoiceCommand;
use crate::commands::ledger::LedgerCommand;
use crate::commands::owner::OwnerCommand;
use crate::commands::product::ProductCommand;
use crate::commands::stock::StockCommand;
use crate::commands::{CommandResult, Context};
use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Debug, Parser)]
#[command(name = "billbook", version, about = "Multi-tenant retail billing")]
struct Cli {
    /// Database file (overrides BILLBOOK_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Owner to act for (overrides BILLBOOK_OWNER_ID)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Acting user (overrides BILLBOOK_ACTOR_ID)
    #[arg(long, global = true)]
    actor: Option<String>,

    /// ADMIN or STAFF (overrides BILLBOOK_ROLE)
    #[arg(long, global = true)]
    role: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Owner profile
    #[command(subcommand)]
    Owner(OwnerCommand),
    /// Product catalogue
    #[command(subcommand)]
    Product(ProductCommand),
    /// Purchases, adjustments and imports
    #[command(subcommand)]
    Stock(StockCommand),
    /// The owner's cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    /// Stock ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string()));
            ExitCode::SUCCESS
        }
        Err(err) => {
            let body = serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string());
            eprintln!("{}", body);
            // exit_code() stays within 1..=6
            ExitCode::from(err.code.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> CommandResult {
    let config = apply_overrides(AppConfig::load()?, &cli)?;
    info!(
        db = %config.db_path.display(),
        owner_id = %config.owner_id,
        role = %config.role,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;
    debug!("Database ready");

    let ctx = Context { db, config };
    let result = dispatch(&ctx, cli.command).await;
    ctx.db.close().await;
    result
}

async fn dispatch(ctx: &Context, command: Command) -> CommandResult {
    match command {
        Command::Owner(cmd) => commands::owner::run(ctx, cmd).await,
        Command::Product(cmd) => commands::product::run(ctx, cmd).await,
        Command::Stock(cmd) => commands::stock::run(ctx, cmd).await,
        Command::Cart(cmd) => commands::cart::run(ctx, cmd).await,
        Command::Invoice(cmd) => commands::invoice::run(ctx, cmd).await,
        Command::Ledger(cmd) => commands::ledger::run(ctx, cmd).await,
    }
}

/// Command line flags win over the environment.
fn apply_overrides(mut config: AppConfig, cli: &Cli) -> Result<AppConfig, ApiError> {
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(owner) = &cli.owner {
        config.owner_id = owner.clone();
    }
    if let Some(actor) = &cli.actor {
        config.actor_id = actor.clone();
    }
    if let Some(role) = &cli.role {
        config.role = role.parse()?;
    }
    Ok(config)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,billbook_cli=info,billbook_db=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
