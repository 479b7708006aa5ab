//! Invoice commands.

use billbook_core::CreateInvoiceRequest;
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ANY_ROLE};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Turn the cart into an invoice
    Create(CreateArgs),
    /// Show an invoice by id or invoice number
    Show {
        id_or_number: String,
    },
    /// Most recent invoices first
    List {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Day's sales, catalogue counts and the latest invoices
    Summary {
        /// UTC day as YYYY-MM-DD (default today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
}

#[derive(Debug, Default, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub customer_name: Option<String>,
    #[arg(long)]
    pub customer_mobile: Option<String>,
    #[arg(long)]
    pub customer_gstin: Option<String>,
    /// GST percent applied to the whole invoice (default 18)
    #[arg(long)]
    pub gst_percent: Option<Decimal>,
    /// CGST_SGST or IGST
    #[arg(long)]
    pub gst_type: Option<String>,
    /// CASH, CARD, UPI or BANK_TRANSFER
    #[arg(long)]
    pub payment_method: Option<String>,
    /// Rupees added to the total, may be negative
    #[arg(long, allow_hyphen_values = true)]
    pub round_off: Option<Decimal>,
}

impl From<CreateArgs> for CreateInvoiceRequest {
    fn from(args: CreateArgs) -> Self {
        CreateInvoiceRequest {
            customer_name: args.customer_name,
            customer_mobile: args.customer_mobile,
            customer_gstin: args.customer_gstin,
            gst_percent: args.gst_percent,
            gst_type: args.gst_type,
            payment_method: args.payment_method,
            round_off: args.round_off,
        }
    }
}

pub async fn run(ctx: &Context, command: InvoiceCommand) -> CommandResult {
    require_role(ctx.config.role, ANY_ROLE)?;
    let invoices = ctx.db.invoices();
    match command {
        InvoiceCommand::Create(args) => {
            let checkout = ctx.db.checkout_with(ctx.config.checkout_config());
            let created = checkout
                .create_invoice(ctx.owner_id(), ctx.actor_id(), args.into())
                .await?;
            to_json(&created)
        }
        InvoiceCommand::Show { id_or_number } => {
            let found = match invoices.get(ctx.owner_id(), &id_or_number).await? {
                Some(inv) => Some(inv),
                None => invoices.get_by_number(ctx.owner_id(), &id_or_number).await?,
            };
            let found = found.ok_or_else(|| ApiError::not_found("Invoice", &id_or_number))?;
            to_json(&found)
        }
        InvoiceCommand::List { limit } => to_json(&invoices.list(ctx.owner_id(), limit).await?),
        InvoiceCommand::Summary { day } => {
            let day = day.unwrap_or_else(|| Utc::now().date_naive());
            to_json(&invoices.summary(ctx.owner_id(), day).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::AppConfig;
    use billbook_core::{CartLineUpdate, Money, NewProduct, OwnerProfile};
    use billbook_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_summary_after_a_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.role = Role::Staff;
        let ctx = Context { db, config };

        ctx.db
            .owners()
            .register(ctx.owner_id(), OwnerProfile { business_name: "Demo".to_string(), ..Default::default() })
            .await
            .unwrap();
        let product = ctx
            .db
            .products()
            .create(
                ctx.owner_id(),
                ctx.actor_id(),
                NewProduct::new("PRD-0001", "Rice", Money::from_cents(10_000)).with_opening_stock(3),
            )
            .await
            .unwrap();
        ctx.db
            .cart()
            .upsert_line(ctx.owner_id(), &product.id, CartLineUpdate::quantity(1))
            .await
            .unwrap();
        run(&ctx, InvoiceCommand::Create(CreateArgs::default())).await.unwrap();

        let out = run(&ctx, InvoiceCommand::Summary { day: None }).await.unwrap();
        assert_eq!(out["invoice_count"], 1);
        assert_eq!(out["sales_total_cents"], 11_800);
        assert_eq!(out["product_count"], 1);
        assert_eq!(out["low_stock_count"], 1);
        assert_eq!(out["recent"].as_array().map(Vec::len), Some(1));
    }
}
