use super::{Command, CommandEngine, CommandError, Operation, RunSummary};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::Settings;
use crate::models::AccountType;
use crate::storage::MemoryStorage;

const HEADER: &str = "op,email,password,name,account,amount,target,description,remember";

fn create_engine() -> Result<CommandEngine<MemoryStorage>> {
    let settings = Settings::default()
        .with_latency(Duration::ZERO)
        .with_password_cost(4);

    Ok(CommandEngine::new(Arc::new(MemoryStorage::new()), settings)?)
}

fn create_temporary_csv(rows: &[&str]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;

    writeln!(file, "{HEADER}")?;

    for row in rows {
        writeln!(file, "{row}")?;
    }

    Ok(file)
}

fn path_of(file: &NamedTempFile) -> Result<&str> {
    file.path().to_str().ok_or_else(|| anyhow!("Temporary path is not valid UTF-8"))
}

fn balance_of(engine: &CommandEngine<MemoryStorage>, email: &str, account_type: AccountType) -> Result<Decimal> {
    engine.report()?
        .into_iter()
        .find(|row| row.email == email && row.account_type == account_type)
        .map(|row| row.balance)
        .ok_or_else(|| anyhow!("No {account_type} account for {email}"))
}

#[tokio::test]
async fn test_engine_replays_a_full_banking_session() -> Result<()> {
    let engine = create_engine()?;
    let file = create_temporary_csv(&[
        "register,ann@bank.com,secret1,Ann,,,,,",
        "deposit,,,,,250.00,,Paycheck,",
        "open,,,,savings,100.00,,,",
        "transfer,,,,checking,300.00,savings,Rainy day,",
        "withdraw,,,,checking,50.00,,ATM,",
        "transfer,,,Landlord,checking,400.00,9876543210,Rent,",
        "logout,,,,,,,,"
    ])?;

    let summary = engine.run(path_of(&file)?).await?;

    assert_eq!(summary, RunSummary { applied: 7, rejected: 0 });
    assert_eq!(balance_of(&engine, "ann@bank.com", AccountType::Checking)?, Decimal::from_str("500.00")?);
    assert_eq!(balance_of(&engine, "ann@bank.com", AccountType::Savings)?, Decimal::from_str("400.00")?);
    assert!(engine.report()?.iter().all(|row| row.reconciled));
    assert!(engine.identity().current_user().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_engine_skips_rejected_and_malformed_rows() -> Result<()> {
    let engine = create_engine()?;
    let file = create_temporary_csv(&[
        "deposit,,,,,10.00,,Before login,",
        "login,test@bank.com,wrong-password,,,,,,",
        "login,test@bank.com,123456,,,,,,",
        "withdraw,,,,,5000.00,,Too much,",
        "deposit,,,,,abc,,Bad amount,",
        "explode,,,,,,,,",
        "deposit,,,,,10.50,,Gift,"
    ])?;

    let summary = engine.run(path_of(&file)?).await?;

    assert_eq!(summary, RunSummary { applied: 2, rejected: 3 });
    assert_eq!(balance_of(&engine, "test@bank.com", AccountType::Checking)?, Decimal::from_str("1010.50")?);

    Ok(())
}

#[tokio::test]
async fn test_engine_applies_admin_and_profile_operations() -> Result<()> {
    let engine = create_engine()?;
    let file = create_temporary_csv(&[
        "login,admin@bank.com,admin123,,,,,,",
        "status,test@bank.com,,,,,inactive,,",
        "logout,,,,,,,,",
        "login,test@bank.com,123456,,,,,,",
        "register,bob@bank.com,secret1,Bob,,,,,",
        "profile,robert@bank.com,,Robert,,,,,",
        "password,,secret1,,,,secret2,,"
    ])?;

    let summary = engine.run(path_of(&file)?).await?;

    assert_eq!(summary, RunSummary { applied: 6, rejected: 1 });

    let test_user = engine.identity().find_by_email("test@bank.com")?.ok_or_else(|| anyhow!("Test user missing"))?;
    assert!(!test_user.is_active);

    let robert = engine.identity().current_user().await.ok_or_else(|| anyhow!("Session missing"))?;
    assert_eq!(robert.name, "Robert");
    assert_eq!(robert.email, "robert@bank.com");

    engine.identity().logout().await?;
    assert!(engine.identity().login("robert@bank.com", "secret2", false).await.is_ok());

    let emails: Vec<String> = engine.report()?.into_iter().map(|row| row.email).collect();
    assert_eq!(emails, vec!["admin@bank.com".to_string(), "robert@bank.com".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_engine_history_and_user_search_are_read_only() -> Result<()> {
    let engine = create_engine()?;
    let file = create_temporary_csv(&[
        "login,test@bank.com,123456,,,,,,",
        "history,,,,checking,,,,",
        "users,,,,,,test,,",
        "login,admin@bank.com,admin123,,,,,,",
        "users,,,,,,test,,",
        "history,,,,savings,,,,"
    ])?;

    let summary = engine.run(path_of(&file)?).await?;

    assert_eq!(summary, RunSummary { applied: 4, rejected: 2 });
    assert_eq!(balance_of(&engine, "test@bank.com", AccountType::Checking)?, Decimal::from(1000));
    assert_eq!(engine.ledger().all_transactions()?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_engine_handles_missing_csv_file_without_error() -> Result<()> {
    let engine = create_engine()?;

    let summary = engine.run("missing.csv").await?;

    assert_eq!(summary, RunSummary::default());
    assert!(engine.report()?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_execute_reports_missing_columns_and_session() -> Result<()> {
    let engine = create_engine()?;
    let command = Command {
        op: Operation::Deposit,
        email: None,
        password: None,
        name: None,
        account: None,
        amount: Some(Decimal::ONE),
        target: None,
        description: None,
        remember: None
    };

    assert!(matches!(engine.execute(&command).await, Err(CommandError::NotAuthenticated { .. })));

    let login = Command { op: Operation::Login, email: Some("test@bank.com".to_string()), amount: None, ..command.clone() };
    assert!(matches!(engine.execute(&login).await, Err(CommandError::MissingField { field: "password", .. })));

    let login = Command { password: Some("123456".to_string()), ..login };
    engine.execute(&login).await?;

    let transfer = Command { op: Operation::Transfer, target: Some("savings".to_string()), ..command.clone() };
    assert!(matches!(engine.execute(&transfer).await, Err(CommandError::AccountTypeNotFound { account_type: AccountType::Savings })));

    let status = Command { op: Operation::Status, email: Some("admin@bank.com".to_string()), target: Some("dormant".to_string()), ..command };
    assert!(matches!(engine.execute(&status).await, Err(CommandError::InvalidField { field: "target", .. })));

    Ok(())
}
