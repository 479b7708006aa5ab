//! Cart commands.

use billbook_core::{CartLineUpdate, Discount};
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ANY_ROLE};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Add a product or change its line; quantity 0 removes it
    Set {
        product_id: String,
        #[arg(long)]
        qty: Option<i64>,
        /// FLAT or PERCENT
        #[arg(long, requires = "discount")]
        discount_kind: Option<String>,
        /// Rupees for FLAT, percent for PERCENT
        #[arg(long, requires = "discount_kind")]
        discount: Option<Decimal>,
    },
    /// List the cart
    List,
    /// Empty the cart
    Clear,
}

pub async fn run(ctx: &Context, command: CartCommand) -> CommandResult {
    require_role(ctx.config.role, ANY_ROLE)?;
    let cart = ctx.db.cart();
    match command {
        CartCommand::Set {
            product_id,
            qty,
            discount_kind,
            discount,
        } => {
            let discount = match (discount_kind, discount) {
                (Some(kind), Some(value)) => Some(Discount::parse(&kind, value)?),
                _ => None,
            };
            let update = CartLineUpdate {
                quantity: qty,
                discount,
            };
            if update.is_empty() {
                return Err(ApiError::validation("Nothing to change: pass --qty or a discount"));
            }
            to_json(&cart.upsert_line(ctx.owner_id(), &product_id, update).await?)
        }
        CartCommand::List => to_json(&cart.list_lines(ctx.owner_id()).await?),
        CartCommand::Clear => {
            let removed = cart.clear(ctx.owner_id()).await?;
            Ok(json!({ "removed": removed }))
        }
    }
}
