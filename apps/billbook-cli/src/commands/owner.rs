//! Owner profile commands.

use billbook_core::OwnerProfile;
use clap::{Args, Subcommand};

use super::{to_json, CommandResult, Context};
use crate::auth::{require_role, ADMIN_ONLY, ANY_ROLE};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum OwnerCommand {
    /// Register the configured owner
    Register(ProfileArgs),
    /// Replace the owner's business profile
    Update(ProfileArgs),
    /// Show the owner's profile and invoice counter
    Show,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Business name printed on invoices
    #[arg(long)]
    pub business_name: String,
    #[arg(long)]
    pub gstin: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    /// Two-digit GST state code
    #[arg(long)]
    pub state_code: Option<String>,
}

impl From<ProfileArgs> for OwnerProfile {
    fn from(args: ProfileArgs) -> Self {
        OwnerProfile {
            business_name: args.business_name,
            gstin: args.gstin,
            address: args.address,
            state: args.state,
            state_code: args.state_code,
        }
    }
}

pub async fn run(ctx: &Context, command: OwnerCommand) -> CommandResult {
    let owners = ctx.db.owners();
    match command {
        OwnerCommand::Register(args) => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            to_json(&owners.register(ctx.owner_id(), args.into()).await?)
        }
        OwnerCommand::Update(args) => {
            require_role(ctx.config.role, ADMIN_ONLY)?;
            to_json(&owners.update_profile(ctx.owner_id(), args.into()).await?)
        }
        OwnerCommand::Show => {
            require_role(ctx.config.role, ANY_ROLE)?;
            let owner = owners
                .get(ctx.owner_id())
                .await?
                .ok_or_else(|| ApiError::not_found("Owner", ctx.owner_id()))?;
            to_json(&owner)
        }
    }
}
