//! Catalogue commands.

use billbook_core::{Money, NewProduct, ProductUpdate, TaxRate};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ADMIN_ONLY, ANY_ROLE};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Add a product to the catalogue
    Create(CreateArgs),
    /// Change product details; omitted flags keep their value
    Update(UpdateArgs),
    /// Remove a product that has no stock history or invoice lines
    Delete {
        id: String,
    },
    /// Show one product by id or SKU
    Get {
        id_or_sku: String,
    },
    /// Search by name, SKU or HSN code
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Products at or below their low-stock threshold
    LowStock,
    /// Next free SKU in the owner's sequence
    NextSku,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// SKU; the next free one is used when omitted
    #[arg(long)]
    pub sku: Option<String>,
    #[arg(long)]
    pub name: String,
    /// Unit price in rupees, e.g. 149.50
    #[arg(long)]
    pub price: Decimal,
    /// GST percent, e.g. 18
    #[arg(long)]
    pub gst: Option<Decimal>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub hsn: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
    #[arg(long)]
    pub low_stock_threshold: Option<i64>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price: Option<Decimal>,
    #[arg(long)]
    pub gst: Option<Decimal>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub hsn: Option<String>,
    #[arg(long)]
    pub low_stock_threshold: Option<i64>,
}

pub async fn run(ctx: &Context, command: ProductCommand) -> CommandResult {
    let products = ctx.db.products();
    match command {
        ProductCommand::Create(args) => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            let sku = match args.sku {
                Some(sku) => sku,
                None => products.next_sku(ctx.owner_id()).await?,
            };
            let mut product = NewProduct::new(sku, args.name, Money::from_decimal_exact("price", args.price)?)
                .with_opening_stock(args.stock);
            if let Some(gst) = args.gst {
                product = product.with_tax_rate(TaxRate::from_percent(gst)?);
            }
            if let Some(category) = args.category {
                product = product.with_category(category);
            }
            product.hsn_code = args.hsn;
            if let Some(threshold) = args.low_stock_threshold {
                product.low_stock_threshold = threshold;
            }
            to_json(&products.create(ctx.owner_id(), ctx.actor_id(), product).await?)
        }
        ProductCommand::Update(args) => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            let update = ProductUpdate {
                name: args.name,
                category: args.category,
                hsn_code: args.hsn,
                price_cents: args
                    .price
                    .map(|p| Money::from_decimal_exact("price", p).map(|m| m.cents()))
                    .transpose()?,
                tax_rate_bps: args.gst.map(|g| TaxRate::from_percent(g).map(|r| r.bps())).transpose()?,
                low_stock_threshold: args.low_stock_threshold,
            };
            to_json(&products.update_details(ctx.owner_id(), &args.id, update).await?)
        }
        ProductCommand::Delete { id } => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            products.delete(ctx.owner_id(), &id).await?;
            Ok(serde_json::json!({ "deleted": id }))
        }
        ProductCommand::Get { id_or_sku } => {
            require_role(ctx.config.role, ANY_ROLE)?;
            let product = match products.get_by_id(ctx.owner_id(), &id_or_sku).await? {
                Some(p) => Some(p),
                None => products.get_by_sku(ctx.owner_id(), &id_or_sku).await?,
            };
            let product = product.ok_or_else(|| ApiError::not_found("Product", &id_or_sku))?;
            to_json(&product)
        }
        ProductCommand::Search { query, limit } => {
            require_role(ctx.config.role, ANY_ROLE)?;
            to_json(&products.search(ctx.owner_id(), &query, limit).await?)
        }
        ProductCommand::LowStock => {
            require_role(ctx.config.role, ANY_ROLE)?;
            to_json(&products.low_stock(ctx.owner_id()).await?)
        }
        ProductCommand::NextSku => {
            require_role(ctx.config.role, ANY_ROLE)?;
            to_json(&products.next_sku(ctx.owner_id()).await?)
        }
    }
}
