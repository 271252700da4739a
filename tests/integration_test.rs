use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output};
use anyhow::{anyhow, Result};
use tempfile::tempdir;

fn run_script(script: &str, store_path: Option<&Path>) -> Result<Output> {
    let binary_path = env!("CARGO_BIN_EXE_local-bank");
    let mut command = Command::new(binary_path);

    command
        .arg(Path::new("samples").join(script))
        .env("BANK_LATENCY_MS", "0")
        .env("BANK_PASSWORD_COST", "4")
        .env_remove("BANK_STORE_PATH");

    if let Some(store_path) = store_path {
        command.env("BANK_STORE_PATH", store_path);
    }

    Ok(command.output()?)
}

fn parse_report(output: &Output) -> Result<HashMap<(String, String), (String, String, String)>> {
    let stdout = String::from_utf8(output.stdout.clone())?;
    let mut lines = stdout.lines();

    assert_eq!(lines.next(), Some("email,account_number,type,balance,reconciled"));

    let mut rows = HashMap::new();

    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();

        assert_eq!(fields.len(), 5);

        rows.insert(
            (fields[0].to_string(), fields[2].to_string()),
            (fields[1].to_string(), fields[3].to_string(), fields[4].to_string())
        );
    }

    Ok(rows)
}

#[test]
fn test_cli_outputs_correct_final_balances() -> Result<()> {
    let output = run_script("sample.csv", None)?;

    assert!(output.status.success());

    let rows = parse_report(&output)?;

    assert_eq!(rows.len(), 3);

    let checking = rows.get(&("ann@bank.com".to_string(), "checking".to_string()))
        .ok_or_else(|| anyhow!("ann checking missing from output"))?;

    assert_eq!(checking.0.len(), 10);
    assert_eq!(checking.1, "500.00");
    assert_eq!(checking.2, "true");

    let savings = rows.get(&("ann@bank.com".to_string(), "savings".to_string()))
        .ok_or_else(|| anyhow!("ann savings missing from output"))?;

    assert_eq!(savings.1, "400.00");
    assert_eq!(savings.2, "true");

    let test_checking = rows.get(&("test@bank.com".to_string(), "checking".to_string()))
        .ok_or_else(|| anyhow!("test checking missing from output"))?;

    assert_eq!(test_checking.1, "1010.50");

    Ok(())
}

#[test]
fn test_cli_deactivated_user_cannot_log_in() -> Result<()> {
    let output = run_script("admin.csv", None)?;

    assert!(output.status.success());

    let rows = parse_report(&output)?;

    assert_eq!(rows.len(), 1);
    assert!(rows.contains_key(&("admin@bank.com".to_string(), "checking".to_string())));

    Ok(())
}

#[test]
fn test_cli_persists_state_in_store_file() -> Result<()> {
    let directory = tempdir()?;
    let store_path = directory.path().join("bank.json");

    let first = run_script("sample.csv", Some(&store_path))?;
    assert!(first.status.success());
    assert!(store_path.exists());

    let first_rows = parse_report(&first)?;
    let second = run_script("returning.csv", Some(&store_path))?;
    assert!(second.status.success());

    let second_rows = parse_report(&second)?;
    let key = ("ann@bank.com".to_string(), "checking".to_string());
    let before = first_rows.get(&key).ok_or_else(|| anyhow!("ann checking missing after first run"))?;
    let after = second_rows.get(&key).ok_or_else(|| anyhow!("ann checking missing after second run"))?;

    assert_eq!(after.0, before.0);
    assert_eq!(after.1, "501.00");
    assert_eq!(second_rows.len(), first_rows.len());

    Ok(())
}

#[test]
fn test_cli_without_arguments_prints_usage() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_local-bank")).output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Usage"));

    Ok(())
}
