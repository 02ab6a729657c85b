//! Interactive BLE characteristic reader
//!
//! Scans for nearby devices, connects to the one you pick and prints the
//! contents of a characteristic as hex.
//!
//! Usage:
//!   ble-read [--adapter INDEX] [--duration SECS]
//!
//! Set `RUST_LOG=debug` to see adapter and connection diagnostics.

use ble_central::{ReadConfig, ble::BtleManager, session};
use clap::Parser;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ble-read")]
#[command(about = "Scan for BLE devices and read a characteristic")]
struct Cli {
    /// Index of the Bluetooth adapter to use
    #[arg(short, long, default_value = "0")]
    adapter: usize,
    /// Scan duration in seconds
    #[arg(short, long, default_value = "5")]
    duration: u64,
}

impl Cli {
    fn config(&self) -> ReadConfig {
        ReadConfig {
            adapter: self.adapter,
            scan_duration: Duration::from_secs(self.duration),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let manager = BtleManager::new().await?;
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();

    session::run(&manager, &cli.config(), stdin, stdout).await?;
    log::debug!("session finished");
    Ok(())
}
