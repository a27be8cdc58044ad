use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

pub type AccountId = i64;

/// Every account opens with S/ 10,000.00.
pub const INITIAL_BALANCE_CENTS: Cents = 1_000_000;

/// National IDs are exactly this many ASCII digits.
pub const NATIONAL_ID_LEN: usize = 8;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub national_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Current balance in cents, never negative
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn can_cover(&self, amount_cents: Cents) -> bool {
        self.balance_cents >= amount_cents
    }
}

/// Fields required to open an account. The id and balance are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub password: String,
}

/// True if the input is a well-formed national ID (exactly 8 ASCII digits).
pub fn is_national_id(input: &str) -> bool {
    input.len() == NATIONAL_ID_LEN && input.bytes().all(|b| b.is_ascii_digit())
}

/// How a user-supplied recipient token should be looked up.
///
/// An 8-digit token is tried as a national ID first and then as a username;
/// anything else can only be a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierToken {
    NationalIdOrUsername(String),
    Username(String),
}

impl IdentifierToken {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if is_national_id(token) {
            Some(IdentifierToken::NationalIdOrUsername(token.to_string()))
        } else {
            Some(IdentifierToken::Username(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IdentifierToken::NationalIdOrUsername(s) | IdentifierToken::Username(s) => s,
        }
    }

    pub fn national_id(&self) -> Option<&str> {
        match self {
            IdentifierToken::NationalIdOrUsername(s) => Some(s),
            IdentifierToken::Username(_) => None,
        }
    }
}

/// Mask an identifier for display: "12345678" -> "123***5678".
/// Identifiers of four characters or fewer are shown as-is.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() <= 4 {
        return identifier.to_string();
    }
    let head: String = chars.iter().take(3).collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}
