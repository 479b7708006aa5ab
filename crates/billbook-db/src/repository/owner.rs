//! # Owner Repository
//!
//! Tenants and their billing profile.
//!
//! The profile is live data: invoices copy it into their own columns at
//! creation time and never read it again, so editing it here cannot change
//! a historical invoice.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use billbook_core::validation::{normalize_optional, validate_id, validate_owner_profile};
use billbook_core::{CompanySnapshot, CoreError, Owner, OwnerProfile};

const OWNER_COLUMNS: &str = "id, business_name, gstin, address, state, state_code, \
                             last_invoice_seq, created_at, updated_at";

/// Repository for owner database operations.
#[derive(Debug, Clone)]
pub struct OwnerRepository {
    pool: SqlitePool,
}

impl OwnerRepository {
    /// Creates a new OwnerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OwnerRepository { pool }
    }

    /// Registers a new owner with its profile.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - owner id already registered
    pub async fn register(&self, owner_id: &str, profile: OwnerProfile) -> DbResult<Owner> {
        validate_id("owner_id", owner_id)?;
        let profile = normalize_profile(profile);
        validate_owner_profile(&profile)?;

        info!(owner_id = %owner_id, business = %profile.business_name, "Registering owner");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO owners (
                id, business_name, gstin, address, state, state_code,
                last_invoice_seq, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            "#,
        )
        .bind(owner_id)
        .bind(&profile.business_name)
        .bind(&profile.gstin)
        .bind(&profile.address)
        .bind(&profile.state)
        .bind(&profile.state_code)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("owner", owner_id),
            other => other,
        })?;

        self.require(owner_id).await
    }

    /// Gets an owner by id.
    pub async fn get(&self, owner_id: &str) -> DbResult<Option<Owner>> {
        let sql = format!("SELECT {OWNER_COLUMNS} FROM owners WHERE id = ?1");
        let owner = sqlx::query_as::<_, Owner>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    /// Gets an owner by id, failing with `OwnerNotFound`.
    pub async fn require(&self, owner_id: &str) -> DbResult<Owner> {
        self.get(owner_id)
            .await?
            .ok_or_else(|| CoreError::OwnerNotFound(owner_id.to_string()).into())
    }

    /// Replaces the editable profile fields.
    ///
    /// Existing invoices keep the company details they were created with.
    pub async fn update_profile(&self, owner_id: &str, profile: OwnerProfile) -> DbResult<Owner> {
        let profile = normalize_profile(profile);
        validate_owner_profile(&profile)?;

        debug!(owner_id = %owner_id, "Updating owner profile");

        let result = sqlx::query(
            r#"
            UPDATE owners SET
                business_name = ?2,
                gstin = ?3,
                address = ?4,
                state = ?5,
                state_code = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(owner_id)
        .bind(&profile.business_name)
        .bind(&profile.gstin)
        .bind(&profile.address)
        .bind(&profile.state)
        .bind(&profile.state_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OwnerNotFound(owner_id.to_string()).into());
        }

        self.require(owner_id).await
    }

    /// Checks that the owner exists, inside the caller's transaction.
    pub(crate) async fn ensure_exists_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM owners WHERE id = ?1")
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(CoreError::OwnerNotFound(owner_id.to_string()).into()),
        }
    }

    /// Advances the owner's invoice counter and snapshots the company profile,
    /// inside the caller's transaction.
    ///
    /// ```text
    /// UPDATE owners SET last_invoice_seq = last_invoice_seq + 1 ... RETURNING
    ///        │
    ///        ├── seq 42 ──► "INV-000042"
    ///        └── business_name, gstin, address, state ──► CompanySnapshot
    /// ```
    ///
    /// Rolling the transaction back also rolls back the counter, so failed
    /// attempts never consume an invoice number.
    pub(crate) async fn allocate_invoice_number_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
    ) -> DbResult<(String, CompanySnapshot)> {
        let row: Option<(i64, String, Option<String>, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                r#"
                UPDATE owners
                SET last_invoice_seq = last_invoice_seq + 1
                WHERE id = ?1
                RETURNING last_invoice_seq, business_name, gstin, address, state, state_code
                "#,
            )
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;

        let (seq, company_name, company_gstin, company_address, company_state, company_state_code) =
            row.ok_or_else(|| CoreError::OwnerNotFound(owner_id.to_string()))?;

        Ok((
            format_invoice_number(seq),
            CompanySnapshot {
                company_name,
                company_gstin,
                company_address,
                company_state,
                company_state_code,
            },
        ))
    }
}

/// Renders a sequence number as an invoice number.
///
/// ## Example
/// ```rust
/// use billbook_db::repository::owner::format_invoice_number;
///
/// assert_eq!(format_invoice_number(42), "INV-000042");
/// ```
pub fn format_invoice_number(seq: i64) -> String {
    format!("INV-{seq:06}")
}

fn normalize_profile(profile: OwnerProfile) -> OwnerProfile {
    OwnerProfile {
        business_name: profile.business_name.trim().to_string(),
        gstin: normalize_optional(profile.gstin).map(|g| g.to_ascii_uppercase()),
        address: normalize_optional(profile.address),
        state: normalize_optional(profile.state),
        state_code: normalize_optional(profile.state_code),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn profile(name: &str) -> OwnerProfile {
        OwnerProfile {
            business_name: name.to_string(),
            gstin: Some("29abcde1234f1z5".to_string()),
            address: Some("12 MG Road, Bengaluru".to_string()),
            state: Some("Karnataka".to_string()),
            state_code: Some("29".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = db.owners().register("owner-1", profile("Sharma Stores")).await.unwrap();

        assert_eq!(owner.business_name, "Sharma Stores");
        assert_eq!(owner.gstin.as_deref(), Some("29ABCDE1234F1Z5"));
        assert_eq!(owner.last_invoice_seq, 0);

        let fetched = db.owners().get("owner-1").await.unwrap().unwrap();
        assert_eq!(fetched.id, "owner-1");
    }

    #[tokio::test]
    async fn test_register_twice_is_duplicate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.owners().register("owner-1", profile("A")).await.unwrap();
        let err = db.owners().register("owner-1", profile("B")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_profile_of_unknown_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.owners().update_profile("ghost", profile("A")).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OwnerNotFound(_))));
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential_and_roll_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.owners().register("owner-1", profile("Sharma Stores")).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        let (first, company) = OwnerRepository::allocate_invoice_number_in(&mut tx, "owner-1")
            .await
            .unwrap();
        assert_eq!(first, "INV-000001");
        assert_eq!(company.company_name, "Sharma Stores");
        tx.rollback().await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        let (again, _) = OwnerRepository::allocate_invoice_number_in(&mut tx, "owner-1")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(again, "INV-000001");

        let mut tx = db.begin_write().await.unwrap();
        let (second, _) = OwnerRepository::allocate_invoice_number_in(&mut tx, "owner-1")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(second, "INV-000002");
    }
}
