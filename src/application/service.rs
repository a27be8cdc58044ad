use std::collections::HashMap;

use crate::domain::{
    build_integrity_report, format_cents, mask_identifier, validate_amount, Account, AccountId,
    Cents, IntegrityReport, Service, ServiceId, ServicePayment, Transaction, TransactionKind,
    MAX_DESCRIPTION_LEN, MAX_INVOICE_NUMBER_LEN,
};
use crate::storage::Repository;

use super::reporting::direction_of;
use super::{AppError, Counterparty, Dashboard, History, HistoryEntry, PaymentEntry};

/// How many rows the dashboard shows per list.
pub const DASHBOARD_ROWS: usize = 5;

/// Application service providing the banking operations.
/// This is the primary interface for any client (CLI, API, assistant, etc.).
#[derive(Clone)]
pub struct BankService {
    pub(super) repo: Repository,
}

/// Result of a committed transfer
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub transaction: Transaction,
    pub recipient_username: String,
    pub recipient_name: String,
    /// Sender's balance right after the transfer
    pub sender_balance: Cents,
}

/// Result of a committed service payment
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub payment: ServicePayment,
    pub transaction: Transaction,
    pub service_name: String,
    /// Payer's balance right after the payment
    pub payer_balance: Cents,
}

fn check_optional_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(AppError::FieldTooLong { field, max }),
        _ => Ok(()),
    }
}

fn check_amount(amount_cents: Cents) -> Result<(), AppError> {
    validate_amount(amount_cents).map_err(|e| AppError::InvalidAmount(e.to_string()))
}

fn log_outcome<T>(workflow: &'static str, account_id: AccountId, result: &Result<T, AppError>) {
    match result {
        Ok(_) => {}
        Err(err) if err.is_rejection() => {
            tracing::warn!(workflow, account_id, error = %err, "workflow rejected")
        }
        Err(err) => {
            tracing::error!(workflow, account_id, error = ?err, "workflow rolled back")
        }
    }
}

impl BankService {
    /// Create a new bank service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Accounts
    // ========================

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Resolve a national ID or username.
    pub async fn find_account(&self, token: &str) -> Result<Account, AppError> {
        self.repo
            .find_by_identifier(token)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(token.trim().to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Current balance as an exact decimal string.
    pub async fn get_balance(&self, account_id: AccountId) -> Result<String, AppError> {
        let balance = self
            .repo
            .get_balance(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        Ok(format_cents(balance))
    }

    // ========================
    // Transfers
    // ========================

    /// Move money from the sender to the account named by `recipient_token`
    /// (national ID or username).
    ///
    /// Checks run in order: amount, description length, recipient exists,
    /// recipient is not the sender, sender can cover the amount. The balance check, both balance
    /// updates and the ledger row share one atomic unit.
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        recipient_token: &str,
        amount_cents: Cents,
        description: Option<String>,
    ) -> Result<TransferRecord, AppError> {
        let result = self
            .run_transfer(sender_id, recipient_token, amount_cents, description)
            .await;
        log_outcome("transfer", sender_id, &result);
        if let Ok(record) = &result {
            tracing::info!(
                transaction_id = record.transaction.id,
                sender_id,
                receiver = %record.recipient_username,
                amount = %format_cents(amount_cents),
                "transfer committed"
            );
        }
        result
    }

    async fn run_transfer(
        &self,
        sender_id: AccountId,
        recipient_token: &str,
        amount_cents: Cents,
        description: Option<String>,
    ) -> Result<TransferRecord, AppError> {
        check_amount(amount_cents)?;
        check_optional_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;

        let mut unit = self.repo.begin().await?;

        let sender = unit
            .get_account(sender_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(sender_id.to_string()))?;

        let recipient = unit
            .find_by_identifier(recipient_token)
            .await?
            .ok_or_else(|| AppError::RecipientNotFound(recipient_token.trim().to_string()))?;

        if recipient.id == sender.id {
            return Err(AppError::SelfTransferNotAllowed);
        }

        if !sender.can_cover(amount_cents) {
            return Err(AppError::InsufficientFunds {
                balance: sender.balance_cents,
                required: amount_cents,
            });
        }

        let sender_balance = unit.adjust_balance(sender.id, -amount_cents).await?;
        unit.adjust_balance(recipient.id, amount_cents).await?;

        let mut transaction =
            Transaction::transfer(sender.id, recipient.id, amount_cents).with_description(description);
        unit.record_transaction(&mut transaction).await?;

        unit.commit().await?;

        Ok(TransferRecord {
            transaction,
            recipient_name: recipient.display_name(),
            recipient_username: recipient.username,
            sender_balance,
        })
    }

    // ========================
    // Service payments
    // ========================

    /// List the payable services, seeding the defaults on first access.
    pub async fn list_services(&self) -> Result<Vec<Service>, AppError> {
        let seeded = self.repo.ensure_services_seeded().await?;
        if seeded > 0 {
            tracing::info!(count = seeded, "seeded default services");
        }
        Ok(self.repo.list_services().await?)
    }

    /// Find a service by numeric ID or exact name.
    pub async fn find_service(&self, selector: &str) -> Result<Service, AppError> {
        self.repo.ensure_services_seeded().await?;
        let selector = selector.trim();

        let found = match selector.parse::<ServiceId>() {
            Ok(id) => self.repo.get_service(id).await?,
            Err(_) => self.repo.get_service_by_name(selector).await?,
        };
        found.ok_or_else(|| AppError::ServiceNotFound(selector.to_string()))
    }

    /// Pay a registered service from the payer's balance.
    ///
    /// One atomic unit debits the payer and writes both the service payment
    /// and its `service_payment` ledger row (no receiver).
    pub async fn pay_service(
        &self,
        payer_id: AccountId,
        service_id: ServiceId,
        amount_cents: Cents,
        invoice_number: Option<String>,
    ) -> Result<PaymentRecord, AppError> {
        let result = self
            .run_payment(payer_id, service_id, amount_cents, invoice_number)
            .await;
        log_outcome("service_payment", payer_id, &result);
        if let Ok(record) = &result {
            tracing::info!(
                payment_id = record.payment.id,
                transaction_id = record.transaction.id,
                payer_id,
                service = %record.service_name,
                amount = %format_cents(amount_cents),
                "service payment committed"
            );
        }
        result
    }

    async fn run_payment(
        &self,
        payer_id: AccountId,
        service_id: ServiceId,
        amount_cents: Cents,
        invoice_number: Option<String>,
    ) -> Result<PaymentRecord, AppError> {
        check_amount(amount_cents)?;
        check_optional_len("invoice number", invoice_number.as_deref(), MAX_INVOICE_NUMBER_LEN)?;

        let mut unit = self.repo.begin().await?;

        let payer = unit
            .get_account(payer_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(payer_id.to_string()))?;

        let service = unit
            .get_service(service_id)
            .await?
            .ok_or_else(|| AppError::ServiceNotFound(service_id.to_string()))?;

        if !payer.can_cover(amount_cents) {
            return Err(AppError::InsufficientFunds {
                balance: payer.balance_cents,
                required: amount_cents,
            });
        }

        let payer_balance = unit.adjust_balance(payer.id, -amount_cents).await?;

        let mut payment = ServicePayment::new(payer.id, service.id, amount_cents)
            .with_invoice_number(invoice_number);
        unit.record_service_payment(&mut payment).await?;

        let mut transaction = Transaction::service_payment(payer.id, amount_cents)
            .with_description(Some(payment.ledger_description(&service.name)));
        transaction.timestamp = payment.timestamp;
        unit.record_transaction(&mut transaction).await?;

        unit.commit().await?;

        Ok(PaymentRecord {
            payment,
            transaction,
            service_name: service.name,
            payer_balance,
        })
    }

    // ========================
    // History
    // ========================

    /// Every ledger row touching the account and every service payment it made.
    pub async fn history(&self, account_id: AccountId) -> Result<History, AppError> {
        let account = self.get_account(account_id).await?;
        let transactions = self
            .repo
            .list_transactions_for_account(account_id, None)
            .await?;
        let payments = self.repo.list_payments_for_account(account_id, None).await?;

        Ok(History {
            transactions: self.history_entries(&account, transactions).await?,
            payments: self.payment_entries(payments).await?,
            account,
        })
    }

    /// Balance plus the latest outgoing rows and service payments.
    pub async fn dashboard(&self, account_id: AccountId) -> Result<Dashboard, AppError> {
        let account = self.get_account(account_id).await?;
        let transactions = self
            .repo
            .list_sent_transactions(account_id, Some(DASHBOARD_ROWS))
            .await?;
        let payments = self
            .repo
            .list_payments_for_account(account_id, Some(DASHBOARD_ROWS))
            .await?;

        Ok(Dashboard {
            balance: format_cents(account.balance_cents),
            recent_transactions: self.history_entries(&account, transactions).await?,
            recent_payments: self.payment_entries(payments).await?,
            account,
        })
    }

    async fn history_entries(
        &self,
        account: &Account,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        let directory: HashMap<AccountId, Account> = self
            .repo
            .list_accounts()
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(transactions
            .into_iter()
            .map(|tx| {
                let direction = direction_of(&tx, account);
                let other = match (tx.kind, direction) {
                    (TransactionKind::ServicePayment, _) => None,
                    (_, super::Direction::Sent) => tx.receiver,
                    (_, super::Direction::Received) => Some(tx.sender),
                };
                let counterparty = other
                    .and_then(|id| directory.get(&id))
                    .map(|a| Counterparty {
                        username: a.username.clone(),
                        display_name: a.display_name(),
                        masked_national_id: mask_identifier(&a.national_id),
                    });

                HistoryEntry {
                    transaction_id: tx.id,
                    kind: tx.kind,
                    direction,
                    counterparty,
                    amount_cents: tx.amount_cents,
                    timestamp: tx.timestamp,
                    description: tx.description,
                }
            })
            .collect())
    }

    async fn payment_entries(
        &self,
        payments: Vec<ServicePayment>,
    ) -> Result<Vec<PaymentEntry>, AppError> {
        let names: HashMap<ServiceId, String> = self
            .repo
            .list_services()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(payments
            .into_iter()
            .map(|payment| PaymentEntry {
                service_name: names
                    .get(&payment.service)
                    .cloned()
                    .unwrap_or_else(|| "?".to_string()),
                payment,
            })
            .collect())
    }

    // ========================
    // Integrity
    // ========================

    /// Replay every balance from the ledger and compare with stored balances.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let transactions = self.repo.list_transactions().await?;
        let payments = self.repo.list_payments().await?;

        Ok(build_integrity_report(&accounts, &transactions, &payments))
    }

    /// Every ledger row, oldest first.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    /// Every service payment, oldest first.
    pub async fn list_all_payments(&self) -> Result<Vec<ServicePayment>, AppError> {
        Ok(self.repo.list_payments().await?)
    }
}
