use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const AMEX_CSV: &str = "\
Date,Description,Amount
01/15/2024,AMAZON.COM*123ABC,-45.99
01/20/2024,XYZ UNKNOWN CORP 99887,-12.50
";

const CHASE_CSV: &str = "\
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
02/05/2024,02/06/2024,STARBUCKS STORE 1234,Food & Drink,Sale,-5.25,
02/07/2024,02/08/2024,SHELL OIL 57442,Gas,Sale,-40.00,
";

fn cardpivot(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cardpivot").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_run_prints_pivot() {
    let home = tempfile::tempdir().unwrap();
    let amex = write(home.path(), "activity.csv", AMEX_CSV);
    let chase = write(home.path(), "Chase1234_Activity.CSV", CHASE_CSV);

    cardpivot(home.path())
        .args(["run", &amex, &chase, "--bank", "amex", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01"))
        .stdout(predicate::str::contains("Shopping"))
        .stdout(predicate::str::contains("$45.99"));
}

#[test]
fn test_run_json() {
    let home = tempfile::tempdir().unwrap();
    let amex = write(home.path(), "activity.csv", AMEX_CSV);

    let output = cardpivot(home.path())
        .args(["run", &amex, "--bank", "amex", "--all", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &json["transactions"][0];
    assert_eq!(first["date"], "2024-01-15");
    assert_eq!(first["amount"], "45.99");
    assert_eq!(first["category"], "Shopping");
    assert_eq!(first["merchant"], "Amazon");
    assert_eq!(json["transactions"][1]["category"], "Uncategorized");
    assert_eq!(json["aggregates"]["summary"]["count"], 2);
    assert_eq!(json["files"][0]["status"], "imported");
}

#[test]
fn test_unrecognized_file_is_a_warning() {
    let home = tempfile::tempdir().unwrap();
    let chase = write(home.path(), "chase.csv", CHASE_CSV);
    let junk = write(home.path(), "page.csv", "<html><body>Sign in</body></html>");

    cardpivot(home.path())
        .args(["run", &chase, &junk, "--all"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("page.csv"))
        .stdout(predicate::str::contains("Dining"));
}

#[test]
fn test_missing_file_is_a_warning_but_no_files_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let chase = write(home.path(), "chase.csv", CHASE_CSV);
    let missing = home.path().join("gone.csv").to_string_lossy().to_string();

    cardpivot(home.path())
        .args(["run", &chase, &missing, "--all"])
        .assert()
        .success()
        .stderr(predicate::str::contains("gone.csv"));

    cardpivot(home.path())
        .args(["run", &missing, "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: No readable statement files"));
}

#[test]
fn test_from_without_to_fails() {
    let home = tempfile::tempdir().unwrap();
    let amex = write(home.path(), "activity.csv", AMEX_CSV);

    cardpivot(home.path())
        .args(["run", &amex, "--from", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from requires --to"));
}

#[test]
fn test_date_range_excludes_other_months() {
    let home = tempfile::tempdir().unwrap();
    let amex = write(home.path(), "activity.csv", AMEX_CSV);
    let chase = write(home.path(), "chase.csv", CHASE_CSV);

    cardpivot(home.path())
        .args(["run", &amex, &chase, "--bank", "chase"])
        .args(["--from", "2024-02-01", "--to", "2024-02-29"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02"))
        .stdout(predicate::str::contains("2024-01").not());
}

#[test]
fn test_export_csv() {
    let home = tempfile::tempdir().unwrap();
    let amex = write(home.path(), "activity.csv", AMEX_CSV);
    let out = home.path().join("exports");

    cardpivot(home.path())
        .args(["export", &amex, "--bank", "amex", "--all", "--format", "csv"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 transactions to 4 files"));

    let transactions = std::fs::read_to_string(out.join("cardpivot_all_transactions.csv")).unwrap();
    assert!(transactions.starts_with(
        "Date,Month,Source Card,Description,Merchant,Category,Original Category,Amount"
    ));
    assert!(transactions.contains("2024-01-15"));
    assert!(out.join("cardpivot_all_pivot.csv").exists());
    assert!(out.join("cardpivot_all_merchants.csv").exists());
    assert!(out.join("cardpivot_all_cards.csv").exists());
}

#[test]
fn test_rules_test_and_list() {
    let home = tempfile::tempdir().unwrap();

    cardpivot(home.path())
        .args(["rules", "test", "STARBUCKS STORE 1234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dining"));

    cardpivot(home.path())
        .args(["rules", "test", "XYZ UNKNOWN CORP 99887"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncategorized"))
        .stdout(predicate::str::contains("no rule matched"));

    cardpivot(home.path())
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Groceries"));
}

#[test]
fn test_init_writes_settings_and_rules() {
    let home = tempfile::tempdir().unwrap();

    cardpivot(home.path())
        .args(["init", "--write-rules"])
        .assert()
        .success();

    let config = home.path().join(".config").join("cardpivot");
    let settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.join("settings.json")).unwrap())
            .unwrap();
    assert_eq!(settings["lookback_days"], 365);
    assert!(settings["rules_file"].as_str().unwrap().ends_with("rules.json"));
    assert!(config.join("rules.json").exists());
}

#[test]
fn test_custom_rules_file_is_used() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join(".config").join("cardpivot");
    std::fs::create_dir_all(&config).unwrap();
    let rules = write(
        &config,
        "rules.json",
        r#"[{"pattern": "xyz unknown", "category": "Consulting", "merchant": "XYZ"}]"#,
    );
    std::fs::write(
        config.join("settings.json"),
        serde_json::json!({ "rules_file": rules }).to_string(),
    )
    .unwrap();

    cardpivot(home.path())
        .args(["rules", "test", "XYZ UNKNOWN CORP 99887"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Consulting"));
}

#[test]
fn test_scan_lists_recent_downloads() {
    let home = tempfile::tempdir().unwrap();
    let downloads = home.path().join("Downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    write(&downloads, "amex_activity.csv", AMEX_CSV);
    write(&downloads, "recipes.csv", "a,b\n");

    cardpivot(home.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("amex_activity.csv"))
        .stdout(predicate::str::contains("recipes.csv").not());
}

#[test]
fn test_completions() {
    let home = tempfile::tempdir().unwrap();
    cardpivot(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cardpivot"));
}
