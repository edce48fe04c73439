//! RustyPeriph - a hardware-independent BLE GATT peripheral core
//!
//! This library implements the peripheral-role GATT server abstraction of an
//! embedded BLE stack: characteristic registration, read/write/subscription
//! dispatch, deferred (asynchronous) completion, connection lifecycle
//! notification and advertisement configuration. The radio and link-layer
//! work is delegated to a pluggable [`PeripheralBackend`].

pub mod buffer;
pub mod error;
pub mod gap;
pub mod peripheral;

// Re-export common types for convenience
pub use buffer::FixedByteBuffer;
pub use error::{AddressParseError, BufferError, PeripheralError, PeripheralResult, Table};
pub use gap::{parse_advertising_data, AdvertisingData, BdAddr};
pub use peripheral::{
    CharacteristicProperties, DeferredToken, Listener, Peripheral, PeripheralBackend,
    PeripheralConfig, PeripheralState, ReadResult, RequestOutcome, WriteResult,
};
