use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_concurrent_batch_conserves_supply() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("transfers.csv");
    common::generate_transfers_csv(&input, 2_000, 25).unwrap();

    let output = Command::new(cargo_bin!("wallet-ledger"))
        .args(["--seed", "0xa1=300", "--seed", "0xc3=700", "batch"])
        .arg(&input)
        .args(["--concurrency", "32"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("address,balance\n"));
    assert_eq!(common::total_balance(&stdout), 1_000);
}
