use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

/// A cardbook command with its own home directory, so settings and data never
/// touch the real user's files.
fn cardbook(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cardbook").expect("binary exists");
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &TempDir) {
    let data_dir = home.path().join("data");
    cardbook(home)
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(contains("Initialized cardbook"));
}

/// One card with a 1000 deposit and a 300 withdrawal.
fn seeded() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    init(&home);
    cardbook(&home)
        .args(["cards", "add", "Mellat", "6104-1111"])
        .assert()
        .success()
        .stdout(contains("Added card 1: Mellat - 6104-1111"));
    cardbook(&home)
        .args(["deposits", "add", "1000", "--card", "1", "--purpose", "salary"])
        .args(["--depositor", "ACME", "--date", "2025-01-02 09:00"])
        .assert()
        .success()
        .stdout(contains("New balance: 1,000.00"));
    cardbook(&home)
        .args(["withdrawals", "add", "300", "--card", "1", "--purpose", "rent"])
        .args(["--date", "2025-01-03"])
        .assert()
        .success()
        .stdout(contains("New balance: 700.00"));
    home
}

#[test]
fn commands_fail_before_init() {
    let home = tempfile::tempdir().unwrap();
    cardbook(&home)
        .args(["cards", "list"])
        .assert()
        .failure()
        .stderr(contains("cardbook init"));
}

#[test]
fn status_counts_records() {
    let home = seeded();
    cardbook(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Cards:         1").and(contains("Deposits:      1")));
}

#[test]
fn overdraft_is_rejected_and_balance_kept() {
    let home = seeded();
    cardbook(&home)
        .args(["withdrawals", "add", "800", "--card", "1", "--purpose", "car"])
        .assert()
        .code(1)
        .stderr(contains("Insufficient funds"));
    cardbook(&home)
        .args(["cards", "list"])
        .assert()
        .success()
        .stdout(contains("700.00"));
}

#[test]
fn deleting_spent_deposit_is_rejected() {
    let home = seeded();
    cardbook(&home)
        .args(["deposits", "delete", "1"])
        .assert()
        .failure()
        .stderr(contains("would go negative"));
    cardbook(&home)
        .args(["withdrawals", "delete", "1"])
        .assert()
        .success()
        .stdout(contains("balance: 1,000.00"));
}

#[test]
fn transactions_feed_lists_both_kinds() {
    let home = seeded();
    cardbook(&home)
        .arg("transactions")
        .assert()
        .success()
        .stdout(
            contains("+1,000.00")
                .and(contains("-300.00"))
                .and(contains("Page 1 of 1 (2 transactions)")),
        );
    cardbook(&home)
        .args(["transactions", "--from", "2025-01-03", "--page", "abc"])
        .assert()
        .success()
        .stdout(contains("(1 transactions)").and(contains("rent")));
    cardbook(&home)
        .args(["transactions", "--search", "acme"])
        .assert()
        .success()
        .stdout(contains("(1 transactions)").and(contains("salary")));
}

#[test]
fn reports_show_totals() {
    let home = seeded();
    cardbook(&home)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(contains("1,000.00").and(contains("300.00")).and(contains("700.00")));
    cardbook(&home)
        .args(["report", "tags"])
        .assert()
        .success()
        .stdout(contains("no tag"));
}

#[test]
fn tag_delete_keeps_transactions() {
    let home = seeded();
    cardbook(&home)
        .args(["tags", "add", "bills", "--color", "#FF8800"])
        .assert()
        .success();
    cardbook(&home)
        .args(["withdrawals", "edit", "1", "--tag", "1"])
        .assert()
        .success();
    cardbook(&home)
        .args(["tags", "delete", "1"])
        .assert()
        .success()
        .stdout(contains("1 transactions untagged"));
    cardbook(&home)
        .args(["withdrawals", "show", "1"])
        .assert()
        .success()
        .stdout(contains("Tag:        -"));
}

#[test]
fn export_writes_csv_to_stdout() {
    let home = seeded();
    cardbook(&home)
        .args(["export", "transactions", "--card", "1"])
        .assert()
        .success()
        .stdout(contains("date,kind,id,amount,card,tag,purpose,depositor,withdrawer").and(
            contains("2025-01-03 00:00:00,withdrawal,1,300.00,Mellat - 6104-1111,,rent,,self"),
        ));
}

#[test]
fn verify_reports_consistent_balances() {
    let home = seeded();
    cardbook(&home)
        .args(["cards", "verify"])
        .assert()
        .success()
        .stdout(contains("All 1 card balances match"));
}
