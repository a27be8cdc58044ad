use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{
    is_national_id, Account, NewAccount, INITIAL_BALANCE_CENTS, MAX_NAME_LEN, MAX_USERNAME_LEN,
};

use super::{AppError, BankService};

/// Who is making a request.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(Account),
}

impl Identity {
    pub fn current_account(&self) -> Option<&Account> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(account) => Some(account),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}

fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    hex::encode(digest)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::FieldTooLong { field, max });
    }
    Ok(())
}

fn check_present(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

/// Trim and check the registration fields.
fn normalize(new: NewAccount) -> Result<NewAccount, AppError> {
    let new = NewAccount {
        username: new.username.trim().to_string(),
        national_id: new.national_id.trim().to_string(),
        first_name: new.first_name.trim().to_string(),
        last_name: new.last_name.trim().to_string(),
        email: new
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        password: new.password,
    };

    if !is_national_id(&new.national_id) {
        return Err(AppError::InvalidNationalId(new.national_id));
    }
    check_present("username", &new.username)?;
    check_present("first name", &new.first_name)?;
    check_present("last name", &new.last_name)?;
    if new.password.is_empty() {
        return Err(AppError::InvalidInput("password is required".into()));
    }
    check_len("username", &new.username, MAX_USERNAME_LEN)?;
    check_len("first name", &new.first_name, MAX_NAME_LEN)?;
    check_len("last name", &new.last_name, MAX_NAME_LEN)?;

    Ok(new)
}

impl BankService {
    /// Open a new account with the standard opening balance.
    pub async fn register(&self, new: NewAccount) -> Result<Account, AppError> {
        let new = normalize(new)?;
        let salt = new_salt();
        let password_hash = hash_password(&salt, &new.password);

        let mut unit = self.repo.begin().await?;
        if unit.get_account_by_national_id(&new.national_id).await?.is_some() {
            return Err(AppError::NationalIdTaken(new.national_id));
        }
        if unit.get_account_by_username(&new.username).await?.is_some() {
            return Err(AppError::UsernameTaken(new.username));
        }
        let account = unit
            .create_account(&new, INITIAL_BALANCE_CENTS, &salt, &password_hash)
            .await?;
        unit.commit().await?;

        tracing::info!(
            account_id = account.id,
            username = %account.username,
            "account registered"
        );
        Ok(account)
    }

    /// Check a username/password pair.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Account, AppError> {
        let Some(account) = self.repo.get_account_by_username(username.trim()).await? else {
            tracing::debug!(username, "login for unknown username");
            return Err(AppError::InvalidCredentials);
        };
        let Some((salt, expected)) = self.repo.get_credentials(account.id).await? else {
            return Err(AppError::InvalidCredentials);
        };

        if hash_password(&salt, password) != expected {
            tracing::warn!(account_id = account.id, "failed login");
            return Err(AppError::InvalidCredentials);
        }
        Ok(account)
    }

    /// Resolve optional login details into an identity.
    /// No username means an anonymous caller; a bad password is an error.
    pub async fn identify(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Identity, AppError> {
        match username {
            None => Ok(Identity::Anonymous),
            Some(username) => {
                let account = self
                    .authenticate(username, password.unwrap_or_default())
                    .await?;
                Ok(Identity::Authenticated(account))
            }
        }
    }
}
