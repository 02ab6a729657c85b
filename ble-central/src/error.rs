use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("adapter {index} not available, found {count} adapter(s)")]
    AdapterOutOfRange { index: usize, count: usize },
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },
    #[error("bluetooth error: {0}")]
    Btle(#[from] btleplug::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
