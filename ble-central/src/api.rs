//! Capability traits over a BLE stack, and the plain records passed through them.

#![allow(async_fn_in_trait)]

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::Result;

/// How long a scan runs when nothing else is configured.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Run configuration for an interactive read session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    /// Index into the adapter list
    pub adapter: usize,
    pub scan_duration: Duration,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            adapter: 0,
            scan_duration: DEFAULT_SCAN_DURATION,
        }
    }
}

/// A GATT service as reported by a connected peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// A (service, characteristic) pair, one entry of the flattened GATT tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicRef {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl fmt::Display for CharacteristicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.service, self.characteristic)
    }
}

/// Notifications delivered while a scan runs
#[derive(Debug, Clone)]
pub enum ScanEvent<P> {
    Started,
    Found(P),
    Stopped,
}

/// Entry point to the host's BLE stack
pub trait Manager {
    type Central: Central;

    async fn adapters(&self) -> Result<Vec<Self::Central>>;
}

/// A host-side BLE adapter
pub trait Central {
    type Peripheral: Peripheral;

    /// Human readable description of the adapter
    async fn info(&self) -> Result<String>;

    /// Scan for `duration`, then stop.
    ///
    /// Events are handed to `on_event` one at a time, in order: `Started`,
    /// any number of `Found`, then `Stopped`. An error returned by `on_event`
    /// aborts the scan.
    async fn scan_for<F>(&self, duration: Duration, on_event: F) -> Result<()>
    where
        F: FnMut(ScanEvent<Self::Peripheral>) -> Result<()>;
}

/// A remote BLE device
pub trait Peripheral: Clone {
    /// Advertised local name, empty when the device did not send one
    fn identifier(&self) -> String;
    fn address(&self) -> String;

    /// Connect and discover the peripheral's services
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;

    /// Services found by the last successful `connect`
    fn services(&self) -> Vec<Service>;

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>>;
}

/// Flatten a service tree into (service, characteristic) pairs, keeping the
/// reported order.
pub fn flatten_services(services: &[Service]) -> Vec<CharacteristicRef> {
    services
        .iter()
        .flat_map(|service| {
            service.characteristics.iter().map(|characteristic| CharacteristicRef {
                service: service.uuid,
                characteristic: *characteristic,
            })
        })
        .collect()
}
