mod common;

use anyhow::Result;
use banco::application::{AppError, Direction};
use banco::domain::{replay_balance, TransactionKind};
use common::{new_account, test_service, Customers};

#[tokio::test]
async fn test_transfer_by_national_id() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    let record = service
        .transfer(ana.id, "87654321", 10050, Some("  rent share ".into()))
        .await?;

    assert_eq!(record.recipient_username, "bruno");
    assert_eq!(record.sender_balance, 989_950);
    assert_eq!(record.transaction.kind, TransactionKind::Transfer);
    assert_eq!(record.transaction.receiver, Some(bruno.id));
    assert_eq!(record.transaction.description.as_deref(), Some("rent share"));

    assert_eq!(service.get_balance(ana.id).await?, "9899.50");
    assert_eq!(service.get_balance(bruno.id).await?, "10100.50");
    Ok(())
}

#[tokio::test]
async fn test_transfer_by_username() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    service.transfer(bruno.id, " ana ", 100, None).await?;

    assert_eq!(service.get_balance(ana.id).await?, "10001.00");
    assert_eq!(service.get_balance(bruno.id).await?, "9999.00");
    Ok(())
}

#[tokio::test]
async fn test_eight_digit_username_fallback() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, .. } = Customers::create(&service).await?;

    // Username made of 8 digits that is nobody's national ID
    let digits = service.register(new_account("11112222", "33334444")).await?;

    service.transfer(ana.id, "11112222", 500, None).await?;
    assert_eq!(service.get_balance(digits.id).await?, "10005.00");

    // National ID wins when both could match
    service.transfer(ana.id, "33334444", 500, None).await?;
    assert_eq!(service.get_balance(digits.id).await?, "10010.00");
    Ok(())
}

#[tokio::test]
async fn test_transfer_rejections_leave_no_trace() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    let err = service.transfer(ana.id, "bruno", 0, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let err = service.transfer(ana.id, "bruno", -5, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let err = service.transfer(ana.id, "nobody", 100, None).await.unwrap_err();
    assert!(matches!(err, AppError::RecipientNotFound(_)));

    let err = service.transfer(ana.id, "12345678", 100, None).await.unwrap_err();
    assert!(matches!(err, AppError::SelfTransferNotAllowed));

    let err = service
        .transfer(ana.id, "bruno", 1_000_001, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientFunds {
            balance: 1_000_000,
            required: 1_000_001
        }
    ));

    let err = service
        .transfer(ana.id, "bruno", 100, Some("x".repeat(256)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FieldTooLong { max: 255, .. }));

    assert_eq!(service.get_balance(ana.id).await?, "10000.00");
    assert_eq!(service.get_balance(bruno.id).await?, "10000.00");
    assert!(service.list_all_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_amount_checked_before_description() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, .. } = Customers::create(&service).await?;

    let err = service
        .transfer(ana.id, "bruno", 0, Some("x".repeat(300)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn test_self_transfer_checked_before_funds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, .. } = Customers::create(&service).await?;

    let err = service
        .transfer(ana.id, "ana", 99_999_999, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SelfTransferNotAllowed));
    Ok(())
}

#[tokio::test]
async fn test_transfer_whole_balance_then_nothing_left() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    let record = service.transfer(ana.id, "bruno", 1_000_000, None).await?;
    assert_eq!(record.sender_balance, 0);

    let err = service.transfer(ana.id, "bruno", 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { balance: 0, .. }));

    assert_eq!(service.get_balance(bruno.id).await?, "20000.00");
    Ok(())
}

#[tokio::test]
async fn test_history_shows_both_directions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    service.transfer(ana.id, "bruno", 1000, Some("first".into())).await?;
    service.transfer(bruno.id, "ana", 300, Some("second".into())).await?;

    let history = service.history(ana.id).await?;
    assert_eq!(history.transactions.len(), 2);

    // Newest first
    let latest = &history.transactions[0];
    assert_eq!(latest.direction, Direction::Received);
    assert_eq!(latest.signed_amount(), 300);
    let counterparty = latest.counterparty.as_ref().unwrap();
    assert_eq!(counterparty.username, "bruno");
    assert_eq!(counterparty.masked_national_id, "876***4321");

    let oldest = &history.transactions[1];
    assert_eq!(oldest.direction, Direction::Sent);
    assert_eq!(oldest.signed_amount(), -1000);

    let all = service.list_all_transactions().await?;
    assert_eq!(replay_balance(ana.id, &all), 999_300);
    Ok(())
}
