#![allow(dead_code)]

use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const WALLETS: [&str; 4] = ["0xa1", "0xb2", "0xc3", "0xd4"];

/// Writes `rows` random transfers between the [`WALLETS`] addresses.
pub fn generate_transfers_csv(path: &Path, rows: usize, max_amount: i64) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["from", "to", "amount"])?;

    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let from = WALLETS[rng.gen_range(0..WALLETS.len())];
        let to = WALLETS[rng.gen_range(0..WALLETS.len())];
        let amount = rng.gen_range(1..=max_amount);
        wtr.write_record([from, to, amount.to_string().as_str()])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Sums the `balance` column of `address,balance` CSV output.
pub fn total_balance(csv_output: &str) -> u64 {
    csv_output
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').nth(1))
        .map(|balance| balance.trim().parse::<u64>().expect("balance column"))
        .sum()
}
