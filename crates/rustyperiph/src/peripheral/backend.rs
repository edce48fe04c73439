//! Backend capability set
//!
//! The radio backend implements [`PeripheralBackend`] and is bound to a
//! [`Peripheral`](super::Peripheral) at construction. In the other direction
//! the backend drives the core through its `notify_*` methods.

use super::types::{ReadResult, WriteResult};
use crate::gap::BdAddr;

/// Operations the peripheral core requires from the radio/link layer.
///
/// All calls are fire-and-forget from the core's perspective; flow control
/// over the link and failure reporting belong to the backend.
pub trait PeripheralBackend {
    /// Pushes a notification or indication for the characteristic
    fn send_notification(&mut self, service_uuid: &str, characteristic_uuid: &str, data: &[u8]);

    /// Answers a read that was previously deferred
    fn send_deferred_read_response(
        &mut self,
        address: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        result: ReadResult,
        data: &[u8],
    );

    /// Answers a write that was previously deferred
    fn send_deferred_write_response(
        &mut self,
        address: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        result: WriteResult,
    );

    /// Replaces the advertisement payload and period
    fn set_advertising_info(&mut self, period_ms: u32, data: &[u8]);

    fn start_advertising(&mut self);
}
