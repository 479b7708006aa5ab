//! Command handlers.
//!
//! Every handler follows the same steps:
//! 1. Check the role guard
//! 2. Call the repository or the invoice transaction
//! 3. Return the result as JSON for `main` to print
//!
//! Handlers never talk to SQLite directly.

pub mod cart;
pub mod invoice;
pub mod ledger;
pub mod owner;
pub mod product;
pub mod stock;

use billbook_db::Database;
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;

pub type CommandResult = Result<Value, ApiError>;

/// What a handler needs: the open database and the acting session.
pub struct Context {
    pub db: Database,
    pub config: AppConfig,
}

impl Context {
    pub fn owner_id(&self) -> &str {
        &self.config.owner_id
    }

    pub fn actor_id(&self) -> &str {
        &self.config.actor_id
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> CommandResult {
    serde_json::to_value(value).map_err(|e| ApiError::internal(format!("Cannot encode output: {}", e)))
}
