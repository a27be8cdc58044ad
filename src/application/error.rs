use thiserror::Error;

use crate::domain::{format_cents, Cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Cannot transfer to your own account")]
    SelfTransferNotAllowed,

    #[error(
        "Insufficient funds: balance {}, required {}",
        money(.balance),
        money(.required)
    )]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Invalid national ID '{0}': must be exactly 8 digits")]
    InvalidNationalId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Username already registered: {0}")]
    UsernameTaken(String),

    #[error("National ID already registered: {0}")]
    NationalIdTaken(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("You need to log in first")]
    AuthenticationRequired,

    #[error("Could not process the request: {0}")]
    StorageFailure(#[from] anyhow::Error),
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

impl AppError {
    /// True for failures caused by the request itself rather than the store.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AppError::StorageFailure(_))
    }
}
