mod common;

use anyhow::Result;
use banco::application::AppError;
use banco::domain::Transaction;
use common::{test_repository, Customers};

#[tokio::test]
async fn test_failed_unit_rolls_back_earlier_writes() -> Result<()> {
    let (repo, service, _temp) = test_repository().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    let mut unit = repo.begin().await?;
    let after_debit = unit.adjust_balance(ana.id, -500).await?;
    assert_eq!(after_debit, 999_500);
    unit.adjust_balance(bruno.id, 500).await?;
    let mut row = Transaction::transfer(ana.id, bruno.id, 500);
    unit.record_transaction(&mut row).await?;

    // The schema refuses a negative balance
    let overdraw = unit.adjust_balance(ana.id, -10_000_000).await;
    assert!(overdraw.is_err());
    drop(unit);

    assert_eq!(service.get_balance(ana.id).await?, "10000.00");
    assert_eq!(service.get_balance(bruno.id).await?, "10000.00");
    assert!(service.list_all_transactions().await?.is_empty());

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    Ok(())
}

#[tokio::test]
async fn test_storage_error_surfaces_as_storage_failure() -> Result<()> {
    let (repo, service, _temp) = test_repository().await?;
    let Customers { ana, .. } = Customers::create(&service).await?;

    let mut unit = repo.begin().await?;
    let err: AppError = unit
        .adjust_balance(ana.id, -10_000_000)
        .await
        .unwrap_err()
        .into();
    drop(unit);

    assert!(matches!(err, AppError::StorageFailure(_)));
    assert!(!err.is_rejection());
    assert_eq!(service.get_balance(ana.id).await?, "10000.00");
    Ok(())
}

#[tokio::test]
async fn test_writer_is_free_after_dropped_unit() -> Result<()> {
    let (repo, service, _temp) = test_repository().await?;
    let Customers { ana, bruno } = Customers::create(&service).await?;

    let mut unit = repo.begin().await?;
    unit.adjust_balance(ana.id, -100).await?;
    drop(unit);

    service.transfer(ana.id, "bruno", 100, None).await?;
    assert_eq!(service.get_balance(ana.id).await?, "9999.00");
    assert_eq!(service.get_balance(bruno.id).await?, "10001.00");
    Ok(())
}
