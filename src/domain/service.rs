use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

pub type ServiceId = i64;
pub type ServicePaymentId = i64;

pub const MAX_SERVICE_NAME_LEN: usize = 100;
pub const MAX_INVOICE_NUMBER_LEN: usize = 50;

/// Reference data seeded the first time services are read from an empty table.
pub const DEFAULT_SERVICES: [&str; 10] = [
    "Agua (SEDAPAL)",
    "Luz (Luz del Sur)",
    "Internet (Claro/Movistar)",
    "Teléfono Fijo",
    "Gas Natural",
    "Arriendo",
    "Tarjeta de Crédito (Visa)",
    "Tarjeta de Crédito (Mastercard)",
    "Educación (Colegio/Universidad)",
    "Salud (Seguro/Clínica)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePayment {
    pub id: ServicePaymentId,
    pub account: AccountId,
    pub service: ServiceId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub timestamp: DateTime<Utc>,
    pub invoice_number: Option<String>,
}

impl ServicePayment {
    /// Create a new payment. The id is assigned by the repository on insert.
    pub fn new(account: AccountId, service: ServiceId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Payment amount must be positive");
        Self {
            id: 0,
            account,
            service,
            amount_cents,
            timestamp: Utc::now(),
            invoice_number: None,
        }
    }

    pub fn with_invoice_number(mut self, invoice_number: Option<String>) -> Self {
        self.invoice_number = invoice_number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }

    /// Description written on the paired ledger row.
    pub fn ledger_description(&self, service_name: &str) -> String {
        format!(
            "Payment of {} (Invoice: {})",
            service_name,
            self.invoice_number.as_deref().unwrap_or("N/A")
        )
    }
}
