//! Statements shared by the read path (pool connections) and the write path
//! (the connection held by an [`AtomicUnit`](super::AtomicUnit)).

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{
    Account, AccountId, Cents, IdentifierToken, NewAccount, Service, ServiceId, ServicePayment,
    Transaction, TransactionKind,
};

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, national_id, username, first_name, last_name, email, balance_cents, created_at";
pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, sender_id, receiver_id, amount_cents, kind, timestamp, description";
pub(crate) const PAYMENT_COLUMNS: &str =
    "id, account_id, service_id, amount_cents, timestamp, invoice_number";

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
pub(crate) fn encode_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

// ========================
// Accounts
// ========================

pub(crate) async fn fetch_account(
    conn: &mut SqliteConnection,
    id: AccountId,
) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch account")?;
    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn fetch_account_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE username = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch account by username")?;
    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn fetch_account_by_national_id(
    conn: &mut SqliteConnection,
    national_id: &str,
) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE national_id = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(national_id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch account by national ID")?;
    row.as_ref().map(row_to_account).transpose()
}

/// National ID first (only for 8-digit tokens), then username.
/// Both columns are unique, so at most one account matches each step.
pub(crate) async fn find_by_identifier(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<Option<Account>> {
    let Some(token) = IdentifierToken::parse(token) else {
        return Ok(None);
    };

    if let Some(national_id) = token.national_id() {
        if let Some(account) = fetch_account_by_national_id(&mut *conn, national_id).await? {
            return Ok(Some(account));
        }
    }

    fetch_account_by_username(conn, token.as_str()).await
}

pub(crate) async fn insert_account(
    conn: &mut SqliteConnection,
    new: &NewAccount,
    balance_cents: Cents,
) -> Result<Account> {
    let created_at = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (national_id, username, first_name, last_name, email, balance_cents, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.national_id)
    .bind(&new.username)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(balance_cents)
    .bind(encode_timestamp(&created_at))
    .execute(conn)
    .await
    .context("Failed to save account")?;

    Ok(Account {
        id: result.last_insert_rowid(),
        national_id: new.national_id.clone(),
        username: new.username.clone(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        email: new.email.clone(),
        balance_cents,
        created_at,
    })
}

pub(crate) async fn insert_credentials(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    salt: &str,
    password_hash: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO credentials (account_id, salt, password_hash) VALUES (?, ?, ?)")
        .bind(account_id)
        .bind(salt)
        .bind(password_hash)
        .execute(conn)
        .await
        .context("Failed to save credentials")?;
    Ok(())
}

/// Apply a signed delta and return the new balance.
/// Sufficiency is the caller's job; the schema's CHECK rejects a negative result.
pub(crate) async fn adjust_balance(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    delta: Cents,
) -> Result<Cents> {
    let row = sqlx::query(
        r#"
        UPDATE accounts
        SET balance_cents = balance_cents + ?
        WHERE id = ?
        RETURNING balance_cents
        "#,
    )
    .bind(delta)
    .bind(account_id)
    .fetch_optional(conn)
    .await
    .context("Failed to adjust balance")?;

    match row {
        Some(row) => Ok(row.get("balance_cents")),
        None => anyhow::bail!("Account {} vanished during balance update", account_id),
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: row.get("id"),
        national_id: row.get("national_id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        balance_cents: row.get("balance_cents"),
        created_at: decode_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
    })
}

pub(crate) fn rows_to_accounts(rows: &[SqliteRow]) -> Result<Vec<Account>> {
    rows.iter().map(row_to_account).collect()
}

// ========================
// Ledger
// ========================

/// Insert a ledger row and write the assigned id back into it.
pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &mut Transaction,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions (sender_id, receiver_id, amount_cents, kind, timestamp, description)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tx.sender)
    .bind(tx.receiver)
    .bind(tx.amount_cents)
    .bind(tx.kind.as_str())
    .bind(encode_timestamp(&tx.timestamp))
    .bind(&tx.description)
    .execute(conn)
    .await
    .context("Failed to save transaction")?;

    tx.id = result.last_insert_rowid();
    Ok(())
}

pub(crate) async fn insert_service_payment(
    conn: &mut SqliteConnection,
    payment: &mut ServicePayment,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO service_payments (account_id, service_id, amount_cents, timestamp, invoice_number)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.account)
    .bind(payment.service)
    .bind(payment.amount_cents)
    .bind(encode_timestamp(&payment.timestamp))
    .bind(&payment.invoice_number)
    .execute(conn)
    .await
    .context("Failed to save service payment")?;

    payment.id = result.last_insert_rowid();
    Ok(())
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let kind_str: String = row.get("kind");
    let timestamp_str: String = row.get("timestamp");

    Ok(Transaction {
        id: row.get("id"),
        sender: row.get("sender_id"),
        receiver: row.get("receiver_id"),
        amount_cents: row.get("amount_cents"),
        kind: TransactionKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
        timestamp: decode_timestamp(&timestamp_str)?,
        description: row.get("description"),
    })
}

pub(crate) fn rows_to_transactions(rows: &[SqliteRow]) -> Result<Vec<Transaction>> {
    rows.iter().map(row_to_transaction).collect()
}

fn row_to_payment(row: &SqliteRow) -> Result<ServicePayment> {
    let timestamp_str: String = row.get("timestamp");

    Ok(ServicePayment {
        id: row.get("id"),
        account: row.get("account_id"),
        service: row.get("service_id"),
        amount_cents: row.get("amount_cents"),
        timestamp: decode_timestamp(&timestamp_str)?,
        invoice_number: row.get("invoice_number"),
    })
}

pub(crate) fn rows_to_payments(rows: &[SqliteRow]) -> Result<Vec<ServicePayment>> {
    rows.iter().map(row_to_payment).collect()
}

// ========================
// Services
// ========================

pub(crate) async fn fetch_service(
    conn: &mut SqliteConnection,
    id: ServiceId,
) -> Result<Option<Service>> {
    let row = sqlx::query("SELECT id, name FROM services WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch service")?;

    Ok(row.map(|row| Service {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

pub(crate) fn rows_to_services(rows: &[SqliteRow]) -> Vec<Service> {
    rows.iter()
        .map(|row| Service {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect()
}
