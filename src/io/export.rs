use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{BankService, HistoryEntry, PaymentEntry};
use crate::domain::{format_cents, Account, AccountId};

/// Account statement snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: Account,
    pub balance: String,
    pub transactions: Vec<HistoryEntry>,
    pub payments: Vec<PaymentEntry>,
}

/// Exporter for an account's statement
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export the account's ledger rows to CSV, newest first.
    /// Amounts are signed from the account holder's side.
    pub async fn export_statement_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let history = self.service.history(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "timestamp",
            "kind",
            "direction",
            "counterparty",
            "amount",
            "description",
        ])?;

        let mut count = 0;
        for entry in &history.transactions {
            let direction = match entry.direction {
                crate::application::Direction::Sent => "sent",
                crate::application::Direction::Received => "received",
            };
            csv_writer.write_record([
                entry.transaction_id.to_string(),
                entry.timestamp.to_rfc3339(),
                entry.kind.as_str().to_string(),
                direction.to_string(),
                entry
                    .counterparty
                    .as_ref()
                    .map(|c| c.username.clone())
                    .unwrap_or_default(),
                format_cents(entry.signed_amount()),
                entry.description.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full statement as a JSON snapshot
    pub async fn export_statement_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<StatementSnapshot> {
        let history = self.service.history(account_id).await?;

        let snapshot = StatementSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balance: format_cents(history.account.balance_cents),
            account: history.account,
            transactions: history.transactions,
            payments: history.payments,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
