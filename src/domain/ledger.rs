use std::collections::HashMap;
use std::fmt;

use super::{
    format_cents, Account, AccountId, Cents, ServicePayment, Transaction, TransactionKind,
    INITIAL_BALANCE_CENTS,
};

/// Replay an account's balance from the ledger.
/// Balance = opening balance + incoming transfers - everything sent
pub fn replay_balance(account_id: AccountId, transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .fold(INITIAL_BALANCE_CENTS, |balance, tx| {
            balance + tx.delta_for(account_id)
        })
}

/// Replay balances for every account touched by the ledger.
/// Accounts with no rows keep the opening balance and are not in the map.
pub fn replay_all_balances(transactions: &[Transaction]) -> HashMap<AccountId, Cents> {
    let mut balances: HashMap<AccountId, Cents> = HashMap::new();

    for tx in transactions {
        *balances.entry(tx.sender).or_insert(INITIAL_BALANCE_CENTS) -= tx.amount_cents;
        if let Some(receiver) = tx.receiver {
            *balances.entry(receiver).or_insert(INITIAL_BALANCE_CENTS) += tx.amount_cents;
        }
    }

    balances
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    BalanceMismatch {
        username: String,
        stored: Cents,
        replayed: Cents,
    },
    NegativeBalance {
        username: String,
        balance: Cents,
    },
    NonPositiveAmount {
        transaction_id: i64,
    },
    PaymentWithReceiver {
        transaction_id: i64,
    },
    UnpairedPayments {
        username: String,
        ledger_rows: usize,
        payment_rows: usize,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::BalanceMismatch {
                username,
                stored,
                replayed,
            } => write!(
                f,
                "{}: stored balance {} does not match ledger {}",
                username,
                format_cents(*stored),
                format_cents(*replayed)
            ),
            IntegrityIssue::NegativeBalance { username, balance } => {
                write!(f, "{}: negative balance {}", username, format_cents(*balance))
            }
            IntegrityIssue::NonPositiveAmount { transaction_id } => {
                write!(f, "transaction {} has a non-positive amount", transaction_id)
            }
            IntegrityIssue::PaymentWithReceiver { transaction_id } => write!(
                f,
                "service payment transaction {} has a receiver",
                transaction_id
            ),
            IntegrityIssue::UnpairedPayments {
                username,
                ledger_rows,
                payment_rows,
            } => write!(
                f,
                "{}: {} service payment transactions but {} payment records",
                username, ledger_rows, payment_rows
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub payment_count: usize,
    /// Sum of all stored balances
    pub total_balance: Cents,
    /// Opening balances minus everything paid out to services
    pub expected_total: Cents,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_balanced(&self) -> bool {
        self.total_balance == self.expected_total
    }

    pub fn is_healthy(&self) -> bool {
        self.is_balanced() && self.issues.is_empty()
    }
}

pub fn build_integrity_report(
    accounts: &[Account],
    transactions: &[Transaction],
    payments: &[ServicePayment],
) -> IntegrityReport {
    let mut issues = Vec::new();
    let replayed = replay_all_balances(transactions);

    for tx in transactions {
        if tx.amount_cents <= 0 {
            issues.push(IntegrityIssue::NonPositiveAmount {
                transaction_id: tx.id,
            });
        }
        if tx.kind == TransactionKind::ServicePayment && tx.receiver.is_some() {
            issues.push(IntegrityIssue::PaymentWithReceiver {
                transaction_id: tx.id,
            });
        }
    }

    let mut ledger_payment_rows: HashMap<AccountId, usize> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::ServicePayment)
    {
        *ledger_payment_rows.entry(tx.sender).or_insert(0) += 1;
    }
    let mut payment_rows: HashMap<AccountId, usize> = HashMap::new();
    for payment in payments {
        *payment_rows.entry(payment.account).or_insert(0) += 1;
    }

    for account in accounts {
        let expected = replayed
            .get(&account.id)
            .copied()
            .unwrap_or(INITIAL_BALANCE_CENTS);
        if expected != account.balance_cents {
            issues.push(IntegrityIssue::BalanceMismatch {
                username: account.username.clone(),
                stored: account.balance_cents,
                replayed: expected,
            });
        }
        if account.balance_cents < 0 {
            issues.push(IntegrityIssue::NegativeBalance {
                username: account.username.clone(),
                balance: account.balance_cents,
            });
        }

        let ledger_rows = ledger_payment_rows.get(&account.id).copied().unwrap_or(0);
        let records = payment_rows.get(&account.id).copied().unwrap_or(0);
        if ledger_rows != records {
            issues.push(IntegrityIssue::UnpairedPayments {
                username: account.username.clone(),
                ledger_rows,
                payment_rows: records,
            });
        }
    }

    let paid_out: Cents = payments.iter().map(|p| p.amount_cents).sum();

    IntegrityReport {
        account_count: accounts.len(),
        transaction_count: transactions.len(),
        payment_count: payments.len(),
        total_balance: accounts.iter().map(|a| a.balance_cents).sum(),
        expected_total: accounts.len() as Cents * INITIAL_BALANCE_CENTS - paid_out,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(id: AccountId, username: &str, balance_cents: Cents) -> Account {
        Account {
            id,
            national_id: format!("{:08}", id),
            username: username.into(),
            first_name: username.into(),
            last_name: "Test".into(),
            email: None,
            balance_cents,
            created_at: Utc::now(),
        }
    }

    fn numbered(mut tx: Transaction, id: i64) -> Transaction {
        tx.id = id;
        tx
    }

    #[test]
    fn test_replay_balance_empty() {
        assert_eq!(replay_balance(1, &[]), INITIAL_BALANCE_CENTS);
    }

    #[test]
    fn test_replay_balance_mixed() {
        let ledger = vec![
            Transaction::transfer(1, 2, 10050),
            Transaction::service_payment(1, 5000),
            Transaction::transfer(2, 1, 50),
        ];

        assert_eq!(replay_balance(1, &ledger), 985_000);
        assert_eq!(replay_balance(2, &ledger), 1_010_000);
        assert_eq!(replay_balance(3, &ledger), INITIAL_BALANCE_CENTS);
    }

    #[test]
    fn test_transfers_are_zero_sum() {
        let ledger = vec![
            Transaction::transfer(1, 2, 1000),
            Transaction::transfer(2, 3, 500),
            Transaction::transfer(3, 1, 200),
        ];

        let balances = replay_all_balances(&ledger);
        let total: Cents = balances.values().sum();

        assert_eq!(total, 3 * INITIAL_BALANCE_CENTS);
    }

    #[test]
    fn test_healthy_report() {
        let accounts = vec![account(1, "ana", 984_950), account(2, "beto", 1_010_050)];
        let ledger = vec![
            numbered(Transaction::transfer(1, 2, 10050), 1),
            numbered(Transaction::service_payment(1, 5000), 2),
        ];
        let payments = vec![ServicePayment::new(1, 1, 5000)];

        let report = build_integrity_report(&accounts, &ledger, &payments);

        assert!(report.is_balanced());
        assert!(report.is_healthy(), "issues: {:?}", report.issues);
        assert_eq!(report.expected_total, 2 * INITIAL_BALANCE_CENTS - 5000);
    }

    #[test]
    fn test_transfer_with_removed_receiver_is_not_flagged() {
        let mut orphaned = numbered(Transaction::transfer(1, 2, 10050), 1);
        orphaned.receiver = None;
        let accounts = vec![account(1, "ana", 989_950)];

        let report = build_integrity_report(&accounts, &[orphaned], &[]);

        assert!(report.issues.is_empty(), "issues: {:?}", report.issues);
        assert_eq!(report.total_balance, 989_950);
    }

    #[test]
    fn test_report_flags_payment_with_receiver() {
        let mut payment_row = numbered(Transaction::service_payment(1, 5000), 7);
        payment_row.receiver = Some(2);
        let accounts = vec![account(1, "ana", 995_000)];
        let payments = vec![ServicePayment::new(1, 1, 5000)];

        let report = build_integrity_report(&accounts, &[payment_row], &payments);

        assert!(report.issues.contains(&IntegrityIssue::PaymentWithReceiver {
            transaction_id: 7
        }));
    }

    #[test]
    fn test_report_flags_mismatch_and_unpaired_payment() {
        let accounts = vec![account(1, "ana", 990_000)];
        let ledger = vec![numbered(Transaction::service_payment(1, 5000), 1)];

        let report = build_integrity_report(&accounts, &ledger, &[]);

        assert!(!report.is_healthy());
        assert!(report.issues.contains(&IntegrityIssue::BalanceMismatch {
            username: "ana".into(),
            stored: 990_000,
            replayed: 995_000,
        }));
        assert!(report.issues.contains(&IntegrityIssue::UnpairedPayments {
            username: "ana".into(),
            ledger_rows: 1,
            payment_rows: 0,
        }));
    }
}
