use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use wallet_ledger::application::batch::process_transfers;
use wallet_ledger::application::bootstrap::{seed_genesis, seed_wallet};
use wallet_ledger::application::engine::TransferEngine;
use wallet_ledger::config::{DEFAULT_MAX_CONNECTIONS, StoreConfig, open_store};
use wallet_ledger::domain::ports::WalletStore;
use wallet_ledger::domain::wallet::{Address, Balance};
use wallet_ledger::interfaces::csv::transfer_reader::TransferReader;
use wallet_ledger::interfaces::csv::wallet_writer::WalletWriter;
use wallet_ledger::logging::{LogFormat, init_logging};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// PostgreSQL connection string. Takes precedence over --db-path.
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Maximum PostgreSQL pool size.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, global = true)]
    max_connections: u32,

    /// Fail a transfer that waits longer than this for a wallet lock. Must be at least 1.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    lock_timeout_ms: Option<u64>,

    /// Create a wallet with an initial balance if it does not exist (ADDRESS=BALANCE).
    #[arg(long = "seed", value_name = "ADDRESS=BALANCE", global = true)]
    seeds: Vec<Seed>,

    /// Seed the genesis wallet when the store is empty.
    #[arg(long, global = true)]
    genesis: bool,

    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move funds between two wallets and print the sender's new balance.
    Transfer {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
    },
    /// Print the balance of one wallet.
    Balance { address: Address },
    /// Print every wallet as CSV.
    Wallets,
    /// Process a CSV of transfers, then print every wallet as CSV.
    Batch {
        /// Input transfers CSV file (from, to, amount)
        input: PathBuf,

        /// Maximum number of transfers in flight.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[derive(Debug, Clone)]
struct Seed {
    address: Address,
    balance: Balance,
}

impl FromStr for Seed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (address, balance) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ADDRESS=BALANCE, got {s:?}"))?;
        let address = Address::parse(address).map_err(|e| e.to_string())?;
        let balance = balance
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid balance {balance:?}: {e}"))?;
        Ok(Self {
            address,
            balance: Balance::new(balance),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format).into_diagnostic()?;

    let config = StoreConfig::from_options(
        cli.db_path,
        cli.database_url,
        cli.max_connections,
        cli.lock_timeout_ms,
    );
    let store = open_store(&config).await.into_diagnostic()?;

    if cli.genesis {
        seed_genesis(store.as_ref()).await.into_diagnostic()?;
    }
    for seed in &cli.seeds {
        seed_wallet(store.as_ref(), &seed.address, seed.balance)
            .await
            .into_diagnostic()?;
    }

    let engine = Arc::new(TransferEngine::new(store));

    match cli.command {
        Command::Transfer { from, to, amount } => {
            let balance = engine
                .transfer(&from, &to, amount)
                .await
                .into_diagnostic()?;
            println!("{balance}");
        }
        Command::Balance { address } => {
            let wallet = engine
                .store()
                .get(&address)
                .await
                .into_diagnostic()?
                .ok_or_else(|| miette!("wallet {address} not found"))?;
            println!("{}", wallet.balance);
        }
        Command::Wallets => {
            print_wallets(engine.store().as_ref()).await?;
        }
        Command::Batch { input, concurrency } => {
            let file = File::open(input).into_diagnostic()?;
            let reader = TransferReader::new(file);
            let summary = process_transfers(engine.clone(), reader.transfers(), concurrency).await;
            tracing::info!(
                committed = summary.committed,
                failed = summary.failed,
                "batch finished"
            );
            print_wallets(engine.store().as_ref()).await?;
        }
    }

    Ok(())
}

async fn print_wallets(store: &dyn WalletStore) -> Result<()> {
    let wallets = store.wallets().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer.write_wallets(wallets).into_diagnostic()?;
    Ok(())
}
