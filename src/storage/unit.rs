use anyhow::{Context, Result};
use sqlx::{Sqlite, Transaction as SqlTransaction};

use crate::domain::{
    Account, AccountId, Cents, NewAccount, Service, ServiceId, ServicePayment, Transaction,
};

use super::queries;

/// One all-or-nothing unit of work on the writer connection.
///
/// Units are serialized: the writer pool holds a single connection, so a
/// balance check made through a unit cannot be invalidated by another unit
/// before this one commits. Dropping a unit without calling [`commit`]
/// rolls everything back.
///
/// [`commit`]: AtomicUnit::commit
pub struct AtomicUnit {
    tx: SqlTransaction<'static, Sqlite>,
}

impl AtomicUnit {
    pub(crate) fn new(tx: SqlTransaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>> {
        queries::fetch_account(&mut self.tx, id).await
    }

    pub async fn get_account_by_username(&mut self, username: &str) -> Result<Option<Account>> {
        queries::fetch_account_by_username(&mut self.tx, username).await
    }

    pub async fn get_account_by_national_id(
        &mut self,
        national_id: &str,
    ) -> Result<Option<Account>> {
        queries::fetch_account_by_national_id(&mut self.tx, national_id).await
    }

    pub async fn find_by_identifier(&mut self, token: &str) -> Result<Option<Account>> {
        queries::find_by_identifier(&mut self.tx, token).await
    }

    pub async fn get_service(&mut self, id: ServiceId) -> Result<Option<Service>> {
        queries::fetch_service(&mut self.tx, id).await
    }

    /// Insert an account and its credentials.
    pub async fn create_account(
        &mut self,
        new: &NewAccount,
        opening_balance: Cents,
        salt: &str,
        password_hash: &str,
    ) -> Result<Account> {
        let account = queries::insert_account(&mut self.tx, new, opening_balance).await?;
        queries::insert_credentials(&mut self.tx, account.id, salt, password_hash).await?;
        Ok(account)
    }

    /// Returns the balance after the adjustment.
    pub async fn adjust_balance(&mut self, account_id: AccountId, delta: Cents) -> Result<Cents> {
        queries::adjust_balance(&mut self.tx, account_id, delta).await
    }

    pub async fn record_transaction(&mut self, tx: &mut Transaction) -> Result<()> {
        queries::insert_transaction(&mut self.tx, tx).await
    }

    pub async fn record_service_payment(&mut self, payment: &mut ServicePayment) -> Result<()> {
        queries::insert_service_payment(&mut self.tx, payment).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit")
    }
}
