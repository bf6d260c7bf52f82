use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_malformed_rows_are_skipped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "from, to, amount").unwrap();
    writeln!(file, "A, B, 1").unwrap();
    writeln!(file, "A, B, not_a_number").unwrap();
    writeln!(file, ", B, 1").unwrap();
    writeln!(file, "A, B, 2").unwrap();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.args(["--seed", "A=10", "batch"]).arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading transfer"))
        .stdout(predicate::str::contains("A,7"))
        .stdout(predicate::str::contains("B,3"));
}

#[test]
fn test_unknown_sender_rows_fail_without_side_effects() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "from, to, amount").unwrap();
    writeln!(file, "ghost, A, 5").unwrap();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.args(["--seed", "A=10", "batch"]).arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("sender wallet ghost not found"))
        .stdout(predicate::eq("address,balance\nA,10\n"));
}

#[test]
fn test_zero_lock_timeout_is_rejected() {
    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.args(["--lock-timeout-ms", "0", "wallets"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--lock-timeout-ms"));

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.args(["--lock-timeout-ms", "1", "--seed", "A=10", "wallets"]);

    cmd.assert().success().stdout(predicate::eq("address,balance\nA,10\n"));
}
