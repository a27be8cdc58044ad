use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

pub type TransactionId = i64;

pub const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money moved between two accounts
    Transfer,
    /// Money paid out to a registered service; leaves the system
    ServicePayment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Transfer => "transfer",
            TransactionKind::ServicePayment => "service_payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(TransactionKind::Transfer),
            "service_payment" => Some(TransactionKind::ServicePayment),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the append-only ledger. Every balance mutation has exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Account whose balance decreased
    pub sender: AccountId,
    /// Account whose balance increased; None for service payments, or once
    /// the receiving account has been removed
    pub receiver: Option<AccountId>,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub kind: TransactionKind,
    /// Server-assigned creation time
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl Transaction {
    /// A peer transfer. The id is assigned by the repository on insert.
    pub fn transfer(sender: AccountId, receiver: AccountId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: 0,
            sender,
            receiver: Some(receiver),
            amount_cents,
            kind: TransactionKind::Transfer,
            timestamp: Utc::now(),
            description: None,
        }
    }

    /// The ledger side of a service payment: no receiver.
    pub fn service_payment(sender: AccountId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: 0,
            sender,
            receiver: None,
            amount_cents,
            kind: TransactionKind::ServicePayment,
            timestamp: Utc::now(),
            description: None,
        }
    }

    /// Blank descriptions are dropped.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }

    /// Signed effect of this row on the given account's balance.
    pub fn delta_for(&self, account_id: AccountId) -> Cents {
        let mut delta = 0;
        if self.sender == account_id {
            delta -= self.amount_cents;
        }
        if self.receiver == Some(account_id) {
            delta += self.amount_cents;
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_row() {
        let tx = Transaction::transfer(1, 2, 10050).with_description(Some("Dinner".into()));

        assert_eq!(tx.kind, TransactionKind::Transfer);
        assert_eq!(tx.receiver, Some(2));
        assert_eq!(tx.description.as_deref(), Some("Dinner"));
        assert_eq!(tx.delta_for(1), -10050);
        assert_eq!(tx.delta_for(2), 10050);
        assert_eq!(tx.delta_for(3), 0);
    }

    #[test]
    fn test_service_payment_row_has_no_receiver() {
        let tx = Transaction::service_payment(1, 5000);

        assert_eq!(tx.kind, TransactionKind::ServicePayment);
        assert_eq!(tx.receiver, None);
        assert_eq!(tx.delta_for(1), -5000);
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let tx = Transaction::transfer(1, 2, 100).with_description(Some("   ".into()));
        assert_eq!(tx.description, None);
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [TransactionKind::Transfer, TransactionKind::ServicePayment] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("transferencia"), None);
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::transfer(1, 2, 0);
    }
}
