//! BLE Central
//!
//! Scans for peripherals, connects, lists GATT services and reads a
//! characteristic. The BLE stack itself sits behind the [`Manager`],
//! [`Central`] and [`Peripheral`] traits; [`ble`] implements them on top of
//! btleplug.
//!
//! # Example
//!
//! ```ignore
//! use ble_central::{ble, session, ReadConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ble::BtleManager::new().await?;
//!     let stdin = std::io::stdin().lock();
//!     let stdout = std::io::stdout().lock();
//!
//!     session::run(&manager, &ReadConfig::default(), stdin, stdout).await?;
//!     Ok(())
//! }
//! ```

mod api;
pub mod ble;
mod error;
pub mod session;

pub use api::{
    Central, CharacteristicRef, DEFAULT_SCAN_DURATION, Manager, Peripheral, ReadConfig,
    ScanEvent, Service, flatten_services,
};
pub use error::Error;
pub use session::{format_byte_array, select};

pub type Result<T> = std::result::Result<T, Error>;
