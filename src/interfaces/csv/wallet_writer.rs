use crate::domain::wallet::Wallet;
use crate::error::Result;
use std::io::Write;

/// Writes wallets as `address,balance` CSV rows.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets<I>(&mut self, wallets: I) -> Result<()>
    where
        I: IntoIterator<Item = Wallet>,
    {
        for wallet in wallets {
            self.writer.serialize(&wallet)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
