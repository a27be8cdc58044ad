// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use banco::application::BankService;
use banco::storage::Repository;
use banco::domain::{Account, NewAccount};
use tempfile::TempDir;

pub const PASSWORD: &str = "s3cret-pass";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BankService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to open the repository directly, alongside a service over it
pub async fn test_repository() -> Result<(Repository, BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    let service = BankService::new(repo.clone());
    Ok((repo, service, temp_dir))
}

pub fn new_account(username: &str, national_id: &str) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        national_id: national_id.to_string(),
        first_name: username.to_string(),
        last_name: "Test".to_string(),
        email: Some(format!("{}@example.com", username)),
        password: PASSWORD.to_string(),
    }
}

/// Test fixture: registered customers
pub struct Customers {
    pub ana: Account,
    pub bruno: Account,
}

impl Customers {
    /// Register ana (12345678) and bruno (87654321), both at 10000.00
    pub async fn create(service: &BankService) -> Result<Self> {
        let ana = service.register(new_account("ana", "12345678")).await?;
        let bruno = service.register(new_account("bruno", "87654321")).await?;
        Ok(Self { ana, bruno })
    }
}
