//! PostgreSQL implementation of BillingRecordStore.
//!
//! Snapshots are stored as JSONB; the subscription id is duplicated into its
//! own indexed column so failed-payment webhooks can find the account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::billing::{
    BillingRecord, BillingRecordParts, CardSnapshot, CustomerSnapshot, InvoiceList,
    SubscriptionSnapshot,
};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::BillingRecordStore;

const SELECT_COLUMNS: &str = r#"
    SELECT account_id, email, customer, card, subscription, is_subscription_active,
           is_payment_failed, invoice_list, version, created_at, updated_at
    FROM billing_accounts
"#;

/// PostgreSQL implementation of the BillingRecordStore port.
pub struct PostgresBillingRecordStore {
    pool: PgPool,
}

impl PostgresBillingRecordStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a billing record.
#[derive(Debug, sqlx::FromRow)]
struct BillingRecordRow {
    account_id: String,
    email: Option<String>,
    customer: Option<Json<CustomerSnapshot>>,
    card: Option<Json<CardSnapshot>>,
    subscription: Option<Json<SubscriptionSnapshot>>,
    is_subscription_active: bool,
    is_payment_failed: bool,
    invoice_list: Option<Json<InvoiceList>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BillingRecordRow> for BillingRecord {
    type Error = DomainError;

    fn try_from(row: BillingRecordRow) -> Result<Self, Self::Error> {
        let account_id = AccountId::new(row.account_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid account_id: {}", e))
        })?;
        let version = u64::try_from(row.version).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid version value: {}", row.version),
            )
        })?;

        BillingRecord::restore(BillingRecordParts {
            account_id,
            email: row.email,
            customer: row.customer.map(|j| j.0),
            card: row.card.map(|j| j.0),
            subscription: row.subscription.map(|j| j.0),
            is_subscription_active: row.is_subscription_active,
            is_payment_failed: row.is_payment_failed,
            invoice_list: row.invoice_list.map(|j| j.0),
            version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Stored billing record is inconsistent: {}", e),
            )
        })
    }
}

fn version_param(version: u64) -> Result<i64, DomainError> {
    i64::try_from(version).map_err(|_| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("Version out of range: {}", version),
        )
    })
}

fn database_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {} billing record: {}", action, e),
    )
}

#[async_trait]
impl BillingRecordStore for PostgresBillingRecordStore {
    async fn insert(&self, record: &BillingRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_accounts (
                account_id, email, customer, card, subscription, subscription_id,
                is_subscription_active, is_payment_failed, invoice_list, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.account_id().as_str())
        .bind(record.email())
        .bind(record.customer().cloned().map(Json))
        .bind(record.card().cloned().map(Json))
        .bind(record.subscription().cloned().map(Json))
        .bind(record.subscription_id())
        .bind(record.is_subscription_active())
        .bind(record.is_payment_failed())
        .bind(record.invoice_list().cloned().map(Json))
        .bind(version_param(record.version())?)
        .bind(*record.created_at().as_datetime())
        .bind(*record.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("billing_accounts_pkey") {
                    return DomainError::new(
                        ErrorCode::AccountExists,
                        "Account already has a billing record",
                    );
                }
            }
            database_error("insert", e)
        })?;

        Ok(())
    }

    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<BillingRecord>, DomainError> {
        let row: Option<BillingRecordRow> =
            sqlx::query_as(&format!("{} WHERE account_id = $1", SELECT_COLUMNS))
                .bind(account_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("find", e))?;

        row.map(BillingRecord::try_from).transpose()
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingRecord>, DomainError> {
        let row: Option<BillingRecordRow> =
            sqlx::query_as(&format!("{} WHERE subscription_id = $1", SELECT_COLUMNS))
                .bind(subscription_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("find", e))?;

        row.map(BillingRecord::try_from).transpose()
    }

    async fn update(
        &self,
        record: &BillingRecord,
        expected_version: u64,
    ) -> Result<BillingRecord, DomainError> {
        let expected = version_param(expected_version)?;

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE billing_accounts SET
                email = $3,
                customer = $4,
                card = $5,
                subscription = $6,
                subscription_id = $7,
                is_subscription_active = $8,
                is_payment_failed = $9,
                invoice_list = $10,
                updated_at = $11,
                version = version + 1
            WHERE account_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(record.account_id().as_str())
        .bind(expected)
        .bind(record.email())
        .bind(record.customer().cloned().map(Json))
        .bind(record.card().cloned().map(Json))
        .bind(record.subscription().cloned().map(Json))
        .bind(record.subscription_id())
        .bind(record.is_subscription_active())
        .bind(record.is_payment_failed())
        .bind(record.invoice_list().cloned().map(Json))
        .bind(*record.updated_at().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("update", e))?;

        if let Some(version) = new_version {
            let version = u64::try_from(version).map_err(|_| {
                DomainError::new(ErrorCode::DatabaseError, "Negative version after update")
            })?;
            return Ok(record.clone().with_version(version));
        }

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT version FROM billing_accounts WHERE account_id = $1")
                .bind(record.account_id().as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("check", e))?;

        match exists {
            Some(actual) => Err(DomainError::new(
                ErrorCode::VersionConflict,
                "Billing record was modified concurrently",
            )
            .with_detail("expected", expected_version.to_string())
            .with_detail("actual", actual.to_string())),
            None => Err(
                DomainError::new(ErrorCode::AccountNotFound, "Billing record not found")
                    .with_detail("account_id", record.account_id().as_str()),
            ),
        }
    }
}
