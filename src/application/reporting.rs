use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Cents, ServicePayment, Transaction, TransactionKind};

/// Dashboard rendered after login: balance plus the latest activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub account: Account,
    /// Exact decimal string, e.g. "9849.50"
    pub balance: String,
    pub recent_transactions: Vec<HistoryEntry>,
    pub recent_payments: Vec<PaymentEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// The other side of a transfer, as shown to the account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub username: String,
    pub display_name: String,
    /// National ID with the middle digits hidden
    pub masked_national_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub transaction_id: i64,
    pub kind: TransactionKind,
    pub direction: Direction,
    /// None for service payments and for receivers that no longer exist
    pub counterparty: Option<Counterparty>,
    pub amount_cents: Cents,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl HistoryEntry {
    /// Signed amount from the account holder's point of view.
    pub fn signed_amount(&self) -> Cents {
        match self.direction {
            Direction::Sent => -self.amount_cents,
            Direction::Received => self.amount_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub payment: ServicePayment,
    pub service_name: String,
}

/// Full history of one account, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub account: Account,
    pub transactions: Vec<HistoryEntry>,
    pub payments: Vec<PaymentEntry>,
}

/// Which side of the row the account is on.
pub(crate) fn direction_of(tx: &Transaction, account: &Account) -> Direction {
    if tx.sender == account.id {
        Direction::Sent
    } else {
        Direction::Received
    }
}
