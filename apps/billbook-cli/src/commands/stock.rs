//! Stock movement commands. All of them are admin only.

use std::path::{Path, PathBuf};

use billbook_core::StockImportRow;
use clap::Subcommand;

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ADMIN_ONLY};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum StockCommand {
    /// Receive goods from a supplier
    Purchase {
        product_id: String,
        quantity: i64,
        #[arg(long)]
        supplier: String,
    },
    /// Apply a signed manual correction
    Adjust {
        product_id: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        #[arg(long)]
        reason: String,
    },
    /// Import stock from a JSON array of `{ "sku", "name", "quantity" }`
    Import {
        file: PathBuf,
    },
}

pub async fn run(ctx: &Context, command: StockCommand) -> CommandResult {
    require_role(ctx.config.role, ADMIN_ONLY)?;
    let inventory = ctx.db.inventory();
    match command {
        StockCommand::Purchase {
            product_id,
            quantity,
            supplier,
        } => to_json(
            &inventory
                .purchase(ctx.owner_id(), &product_id, quantity, &supplier, ctx.actor_id())
                .await?,
        ),
        StockCommand::Adjust {
            product_id,
            delta,
            reason,
        } => to_json(
            &inventory
                .adjust(ctx.owner_id(), &product_id, delta, &reason, ctx.actor_id())
                .await?,
        ),
        StockCommand::Import { file } => {
            let rows = read_rows(&file)?;
            to_json(&inventory.import_stock(ctx.owner_id(), &rows, ctx.actor_id()).await?)
        }
    }
}

fn read_rows(file: &Path) -> Result<Vec<StockImportRow>, ApiError> {
    let raw = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&raw)?)
}
