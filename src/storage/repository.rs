use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::domain::{
    Account, AccountId, Cents, Service, ServiceId, ServicePayment, Transaction, DEFAULT_SERVICES,
};

use super::queries::{self, ACCOUNT_COLUMNS, PAYMENT_COLUMNS, TRANSACTION_COLUMNS};
use super::{AtomicUnit, MIGRATION_001_INITIAL, MIGRATION_002_SERVICES};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for accounts, the ledger and service reference data.
///
/// Reads go through a regular pool. Writes go through [`AtomicUnit`]s opened
/// on a separate single-connection pool, which serializes every workflow that
/// mutates a balance.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    writer: SqlitePool,
}

impl Repository {
    /// Create a repository from a reader pool and a writer pool.
    /// The writer pool must hold at most one connection.
    pub fn new(pool: SqlitePool, writer: SqlitePool) -> Self {
        Self { pool, writer }
    }

    /// Connect to a SQLite database.
    /// Pass `?mode=rwc` in the URL to create the file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options.clone())
            .await
            .context("Failed to connect to database")?;
        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open writer connection")?;

        Ok(Self::new(pool, writer))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.writer)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_SERVICES)
            .execute(&self.writer)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open an atomic unit. Waits until no other unit is in flight.
    pub async fn begin(&self) -> Result<AtomicUnit> {
        let tx = self
            .writer
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(AtomicUnit::new(tx))
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        queries::fetch_account(&mut conn, id).await
    }

    /// Get an account by username.
    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        queries::fetch_account_by_username(&mut conn, username).await
    }

    /// Resolve a national ID or username to an account.
    pub async fn find_by_identifier(&self, token: &str) -> Result<Option<Account>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        queries::find_by_identifier(&mut conn, token).await
    }

    /// List all accounts, ordered by username.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM accounts ORDER BY username", ACCOUNT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        queries::rows_to_accounts(&rows)
    }

    /// Current stored balance of an account.
    pub async fn get_balance(&self, id: AccountId) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance_cents FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|row| row.get("balance_cents")))
    }

    /// Salt and password hash for an account, if it has credentials.
    pub async fn get_credentials(&self, account_id: AccountId) -> Result<Option<(String, String)>> {
        let row = sqlx::query("SELECT salt, password_hash FROM credentials WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credentials")?;

        Ok(row.map(|row| (row.get("salt"), row.get("password_hash"))))
    }

    // ========================
    // Service operations
    // ========================

    /// Seed the canonical services if the table is empty.
    /// Returns the number of services inserted.
    pub async fn ensure_services_seeded(&self) -> Result<usize> {
        let mut tx = self
            .writer
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let count: i64 = sqlx::query("SELECT COUNT(*) as count FROM services")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count services")?
            .get("count");
        if count > 0 {
            return Ok(0);
        }

        for name in DEFAULT_SERVICES {
            sqlx::query("INSERT OR IGNORE INTO services (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .context("Failed to seed services")?;
        }
        tx.commit().await.context("Failed to commit seeded services")?;

        Ok(DEFAULT_SERVICES.len())
    }

    /// List all services, ordered by ID.
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query("SELECT id, name FROM services ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list services")?;

        Ok(queries::rows_to_services(&rows))
    }

    /// Get a service by ID.
    pub async fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        queries::fetch_service(&mut conn, id).await
    }

    /// Get a service by its exact name.
    pub async fn get_service_by_name(&self, name: &str) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT id, name FROM services WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch service by name")?;

        Ok(row.map(|row| Service {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    // ========================
    // Ledger queries
    // ========================

    /// Every ledger row, oldest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let sql = format!("SELECT {} FROM transactions ORDER BY id", TRANSACTION_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        queries::rows_to_transactions(&rows)
    }

    /// Ledger rows where the account is sender or receiver, newest first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE sender_id = ? OR receiver_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(account_id)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for account")?;

        queries::rows_to_transactions(&rows)
    }

    /// Ledger rows sent by the account (transfers out and service payments), newest first.
    pub async fn list_sent_transactions(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE sender_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sent transactions")?;

        queries::rows_to_transactions(&rows)
    }

    /// Every service payment, oldest first.
    pub async fn list_payments(&self) -> Result<Vec<ServicePayment>> {
        let sql = format!("SELECT {} FROM service_payments ORDER BY id", PAYMENT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list service payments")?;

        queries::rows_to_payments(&rows)
    }

    /// Service payments made by the account, newest first.
    pub async fn list_payments_for_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<ServicePayment>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM service_payments
            WHERE account_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list service payments for account")?;

        queries::rows_to_payments(&rows)
    }
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}
