mod common;

use anyhow::Result;
use banco::application::{AppError, Identity};
use common::{new_account, test_service, PASSWORD};

#[tokio::test]
async fn test_register_opens_account_with_initial_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.register(new_account("ana", "12345678")).await?;

    assert_eq!(account.username, "ana");
    assert_eq!(account.national_id, "12345678");
    assert_eq!(account.email.as_deref(), Some("ana@example.com"));
    assert_eq!(service.get_balance(account.id).await?, "10000.00");
    Ok(())
}

#[tokio::test]
async fn test_register_rejects_duplicates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.register(new_account("ana", "12345678")).await?;

    let err = service
        .register(new_account("other", "12345678"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NationalIdTaken(_)));

    let err = service
        .register(new_account("ana", "99999999"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UsernameTaken(_)));
    Ok(())
}

#[tokio::test]
async fn test_register_rejects_bad_national_id() -> Result<()> {
    let (service, _temp) = test_service().await?;

    for bad in ["1234567", "123456789", "abcdefgh"] {
        let err = service.register(new_account("ana", bad)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidNationalId(_)), "{}", bad);
    }
    assert!(service.list_accounts().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_authenticate() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = service.register(new_account("ana", "12345678")).await?;

    let logged_in = service.authenticate("ana", PASSWORD).await?;
    assert_eq!(logged_in.id, ana.id);

    let err = service.authenticate("ana", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    let err = service.authenticate("ghost", PASSWORD).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn test_identify() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.register(new_account("ana", "12345678")).await?;

    let anonymous = service.identify(None, None).await?;
    assert!(!anonymous.is_authenticated());

    let identity = service.identify(Some("ana"), Some(PASSWORD)).await?;
    match identity {
        Identity::Authenticated(account) => assert_eq!(account.username, "ana"),
        Identity::Anonymous => panic!("expected an authenticated identity"),
    }

    assert!(service.identify(Some("ana"), None).await.is_err());
    Ok(())
}
