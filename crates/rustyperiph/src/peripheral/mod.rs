//! GATT peripheral role
//!
//! A hardware-independent state machine for the peripheral side of a BLE
//! link: characteristic registration, read/write/subscription dispatch,
//! deferred completion, lifecycle listeners and advertising, with the radio
//! work delegated to a [`PeripheralBackend`].

pub mod backend;
pub mod constants;
pub mod deferred;
pub mod listeners;
pub mod registry;
pub mod server;
pub mod types;


pub use self::backend::PeripheralBackend;
pub use self::deferred::{DeferredKind, DeferredOperation, DeferredOperationTracker, DeferredToken};
pub use self::listeners::{Listener, ListenerRegistry};
pub use self::registry::{CharacteristicEntry, CharacteristicRegistry, ReadAccess, WriteAccess};
pub use self::server::{Peripheral, PeripheralConfig};
pub use self::types::*;
