#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed A and move part of it to B.
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "from, to, amount").unwrap();
    writeln!(csv1, "A, B, 30").unwrap();

    let output1 = Command::new(cargo_bin!("wallet-ledger"))
        .arg("--db-path")
        .arg(&db_path)
        .args(["--seed", "A=100", "batch"])
        .arg(csv1.path())
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("A,70"));
    assert!(stdout1.contains("B,30"));

    // 2. Second run against the same DB; re-seeding A must not mint again.
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "from, to, amount").unwrap();
    writeln!(csv2, "B, A, 10").unwrap();

    let output2 = Command::new(cargo_bin!("wallet-ledger"))
        .arg("--db-path")
        .arg(&db_path)
        .args(["--seed", "A=100", "batch"])
        .arg(csv2.path())
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("A,80"));
    assert!(stdout2.contains("B,20"));
    assert_eq!(common::total_balance(&stdout2), 100);
}

#[test]
fn test_rocksdb_concurrent_batch_conserves_supply() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let input = dir.path().join("transfers.csv");
    common::generate_transfers_csv(&input, 500, 40).unwrap();

    let output = Command::new(cargo_bin!("wallet-ledger"))
        .arg("--db-path")
        .arg(&db_path)
        .args(["--seed", "0xa1=500", "--seed", "0xb2=500", "batch"])
        .arg(&input)
        .args(["--concurrency", "16"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(common::total_balance(&stdout), 1_000);
}
