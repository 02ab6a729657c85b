//! btleplug backed implementation of the BLE capability traits
//!
//! Wraps the platform manager, adapter and peripheral types so the session
//! can drive a real radio.

use btleplug::api::{
    Central as _, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
};
use btleplug::platform::{self, PeripheralId};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::hash::Hash;
use std::pin::pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{Central, Error, Manager, Peripheral, Result, ScanEvent, Service};

/// The host's BLE stack
pub struct BtleManager {
    inner: platform::Manager,
}

impl BtleManager {
    pub async fn new() -> Result<Self> {
        let inner = platform::Manager::new().await?;
        Ok(Self { inner })
    }
}

impl Manager for BtleManager {
    type Central = BtleAdapter;

    async fn adapters(&self) -> Result<Vec<BtleAdapter>> {
        let adapters = self.inner.adapters().await?;
        log::debug!("platform reported {} adapter(s)", adapters.len());
        Ok(adapters.into_iter().map(|inner| BtleAdapter { inner }).collect())
    }
}

/// Adapter events the scan cares about
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sighting<I> {
    Discovered(I),
    Updated(I),
}

fn sighting(event: CentralEvent) -> Option<Sighting<PeripheralId>> {
    match event {
        CentralEvent::DeviceDiscovered(id) => Some(Sighting::Discovered(id)),
        CentralEvent::DeviceUpdated(id) => Some(Sighting::Updated(id)),
        _ => None,
    }
}

/// Forward sightings to `on_event` until `deadline`.
///
/// Each id is looked up and delivered once. Later sightings of a delivered id
/// go to `refresh`. If the stream ends early the call still waits for the
/// deadline.
async fn forward_sightings<I, P, S, L, LF, R, RF, F>(
    events: &mut S,
    deadline: Instant,
    mut lookup: L,
    mut refresh: R,
    on_event: &mut F,
) -> Result<()>
where
    I: Eq + Hash + Clone,
    P: Clone,
    S: Stream<Item = Sighting<I>> + Unpin,
    L: FnMut(I) -> LF,
    LF: Future<Output = Result<P>>,
    R: FnMut(P) -> RF,
    RF: Future<Output = Result<()>>,
    F: FnMut(ScanEvent<P>) -> Result<()>,
{
    let mut seen: HashMap<I, P> = HashMap::new();

    loop {
        let sighting = match tokio::time::timeout_at(deadline, events.next()).await {
            Ok(Some(sighting)) => sighting,
            Ok(None) => {
                log::warn!("adapter event stream closed before the scan window ended");
                tokio::time::sleep_until(deadline).await;
                return Ok(());
            }
            Err(_) => return Ok(()),
        };

        match sighting {
            Sighting::Discovered(id) if !seen.contains_key(&id) => {
                let peripheral = lookup(id.clone()).await?;
                seen.insert(id, peripheral.clone());
                on_event(ScanEvent::Found(peripheral))?;
            }
            Sighting::Discovered(id) | Sighting::Updated(id) => {
                // updates for ids not yet discovered are followed by a discovery
                if let Some(peripheral) = seen.get(&id) {
                    if let Err(e) = refresh(peripheral.clone()).await {
                        log::debug!("could not refresh peripheral properties: {e}");
                    }
                }
            }
        }
    }
}

/// A BLE adapter on this host
pub struct BtleAdapter {
    inner: platform::Adapter,
}

impl BtleAdapter {
    async fn lookup(&self, id: PeripheralId) -> Result<BtlePeripheral> {
        let peripheral = self.inner.peripheral(&id).await?;
        let properties = peripheral.properties().await?;
        Ok(BtlePeripheral::new(peripheral, properties))
    }
}

impl Central for BtleAdapter {
    type Peripheral = BtlePeripheral;

    async fn info(&self) -> Result<String> {
        Ok(self.inner.adapter_info().await?)
    }

    async fn scan_for<F>(&self, duration: Duration, mut on_event: F) -> Result<()>
    where
        F: FnMut(ScanEvent<BtlePeripheral>) -> Result<()>,
    {
        // Subscribe before starting so early discoveries are not lost
        let events = self.inner.events().await?;
        let mut sightings =
            pin!(events.filter_map(|event| futures::future::ready(sighting(event))));
        let deadline = Instant::now() + duration;

        self.inner.start_scan(ScanFilter::default()).await?;
        log::debug!("scanning for {:?}", duration);

        let discovered = match on_event(ScanEvent::Started) {
            Ok(()) => {
                forward_sightings(
                    &mut sightings,
                    deadline,
                    move |id| self.lookup(id),
                    |peripheral: BtlePeripheral| async move { peripheral.refresh().await },
                    &mut on_event,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let stopped = self.inner.stop_scan().await;

        discovered?;
        stopped?;
        on_event(ScanEvent::Stopped)
    }
}

/// A peripheral seen during a scan
///
/// The address is captured at discovery. The name is updated while the scan
/// runs, since it often arrives in a later scan response.
#[derive(Debug, Clone)]
pub struct BtlePeripheral {
    inner: platform::Peripheral,
    identifier: Arc<Mutex<String>>,
    address: String,
}

impl BtlePeripheral {
    fn new(inner: platform::Peripheral, properties: Option<PeripheralProperties>) -> Self {
        let identifier = properties.and_then(|p| p.local_name).unwrap_or_default();
        let address = inner.address().to_string();
        Self {
            inner,
            identifier: Arc::new(Mutex::new(identifier)),
            address,
        }
    }

    async fn refresh(&self) -> Result<()> {
        let properties = self.inner.properties().await?;
        if let Some(name) = properties.and_then(|p| p.local_name) {
            *self.identifier.lock().unwrap_or_else(|e| e.into_inner()) = name;
        }
        Ok(())
    }
}

impl Peripheral for BtlePeripheral {
    fn identifier(&self) -> String {
        self.identifier.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> Result<()> {
        self.inner.connect().await?;
        log::info!("connected to {}", self.address);
        self.inner.discover_services().await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await?;
        log::info!("disconnected from {}", self.address);
        Ok(())
    }

    fn services(&self) -> Vec<Service> {
        self.inner
            .services()
            .into_iter()
            .map(|service| Service {
                uuid: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect()
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>> {
        let target = self
            .inner
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(Error::CharacteristicNotFound {
                service,
                characteristic,
            })?;

        let value = self.inner.read(&target).await?;
        log::debug!("read {} byte(s) from {}", value.len(), characteristic);
        Ok(value)
    }
}
