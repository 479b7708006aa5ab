//! Stock ledger commands.

use billbook_core::{LedgerFilter, StockMovementType};
use clap::Subcommand;
use serde_json::json;

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ADMIN_ONLY, ANY_ROLE};

#[derive(Debug, Subcommand)]
pub enum LedgerCommand {
    /// Stock movements, newest first
    History {
        #[arg(long)]
        product: Option<String>,
        /// manual_adjustment, purchase, invoice_sale or import
        #[arg(long = "type")]
        movement_type: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Current ledger balance of one product
    Balance {
        product_id: String,
    },
    /// Products whose stock disagrees with their ledger
    Verify,
}

pub async fn run(ctx: &Context, command: LedgerCommand) -> CommandResult {
    let ledger = ctx.db.ledger();
    match command {
        LedgerCommand::History {
            product,
            movement_type,
            limit,
        } => {
            require_role(ctx.config.role, ANY_ROLE)?;
            let movement_type = movement_type
                .map(|t| t.parse::<StockMovementType>())
                .transpose()?;
            let filter = LedgerFilter {
                product_id: product,
                movement_type,
                limit,
                ..Default::default()
            };
            to_json(&ledger.history(ctx.owner_id(), &filter).await?)
        }
        LedgerCommand::Balance { product_id } => {
            require_role(ctx.config.role, ANY_ROLE)?;
            let balance = ledger.balance_for(ctx.owner_id(), &product_id).await?;
            Ok(json!({ "productId": product_id, "balance": balance }))
        }
        LedgerCommand::Verify => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            to_json(&ledger.verify_all(ctx.owner_id()).await?)
        }
    }
}
