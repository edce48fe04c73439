//! Peripheral server core
//!
//! Ties the characteristic registry, deferred operation tracker, listener
//! registry and advertising configurator to one radio backend.
//!
//! # Dispatch model
//!
//! The core is single threaded: every `notify_*` entry point must be called
//! sequentially from the backend's event context and none of them blocks.
//! Backends that can re-enter (for example from an interrupt) must serialize
//! their calls into the core themselves. Registration is expected to finish
//! before the backend starts dispatching events.
//!
//! Deferred reads and writes return control to the backend immediately and
//! are resumed by the application through
//! [`complete_deferred_read`](Peripheral::complete_deferred_read) /
//! [`complete_deferred_write`](Peripheral::complete_deferred_write). There is
//! no timeout; an operation that is never completed holds its slot until the
//! peer disconnects (when `release_deferred_on_disconnect` is set) or
//! forever.

use super::backend::PeripheralBackend;
use super::constants::*;
use super::deferred::{DeferredKind, DeferredOperation, DeferredOperationTracker, DeferredToken};
use super::listeners::{Listener, ListenerRegistry};
use super::registry::{CharacteristicEntry, CharacteristicRegistry, ReadAccess, WriteAccess};
use super::types::*;
use crate::buffer::FixedByteBuffer;
use crate::error::{PeripheralError, PeripheralResult};
use crate::gap::{AdvertisingConfigurator, BdAddr};
use log::{debug, info, trace, warn};

/// Peripheral configuration
#[derive(Debug, Clone)]
pub struct PeripheralConfig {
    /// Number of distinct characteristics that can be registered
    pub max_characteristics: usize,
    /// Number of lifecycle listeners
    pub max_listeners: usize,
    /// Number of reads/writes that may be pending at once
    pub max_deferred_operations: usize,
    /// Free a peer's pending deferred operations when it disconnects
    pub release_deferred_on_disconnect: bool,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            max_characteristics: DEFAULT_MAX_CHARACTERISTICS,
            max_listeners: DEFAULT_MAX_LISTENERS,
            max_deferred_operations: DEFAULT_MAX_DEFERRED_OPERATIONS,
            release_deferred_on_disconnect: true,
        }
    }
}

/// Hardware-independent GATT peripheral
pub struct Peripheral<B: PeripheralBackend> {
    config: PeripheralConfig,
    state: PeripheralState,
    backend: B,
    characteristics: CharacteristicRegistry,
    listeners: ListenerRegistry,
    deferred: DeferredOperationTracker,
    advertising: AdvertisingConfigurator,
}

impl<B: PeripheralBackend> Peripheral<B> {
    /// Create a new peripheral bound to `backend` with the default configuration
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, PeripheralConfig::default())
    }

    /// Create a new peripheral bound to `backend`; all tables are sized here
    pub fn with_config(backend: B, config: PeripheralConfig) -> Self {
        Self {
            characteristics: CharacteristicRegistry::new(config.max_characteristics),
            listeners: ListenerRegistry::new(config.max_listeners),
            deferred: DeferredOperationTracker::new(config.max_deferred_operations),
            advertising: AdvertisingConfigurator::new(),
            state: PeripheralState::Uninitialized,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &PeripheralConfig {
        &self.config
    }

    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PeripheralState::Ready
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Marks registration as finished; the backend is now expected to report readiness
    pub fn start(&mut self) {
        if self.state == PeripheralState::Uninitialized {
            debug!("Peripheral awaiting backend readiness");
            self.state = PeripheralState::AwaitingReady;
        }
    }

    pub fn add_listener(&mut self, listener: Listener) -> PeripheralResult<()> {
        self.listeners.add(listener)
    }

    /// Registers any kind of handler for a characteristic
    pub fn register_handler(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        handler: CharacteristicHandler,
    ) -> PeripheralResult<()> {
        self.characteristics
            .register(service_uuid, characteristic_uuid, handler)
    }

    /// Registers a synchronous read handler and adds the push properties
    pub fn register_read_handler<F>(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        allow_notifications: bool,
        allow_indications: bool,
        handler: F,
    ) -> PeripheralResult<()>
    where
        F: FnMut(&mut FixedByteBuffer) -> ReadResult + Send + 'static,
    {
        self.characteristics.register_with_properties(
            service_uuid,
            characteristic_uuid,
            CharacteristicProperties::from_flags(allow_notifications, allow_indications),
            CharacteristicHandler::Read(Box::new(handler)),
        )
    }

    /// Registers a deferred read handler and adds the push properties.
    ///
    /// The handler receives a token to answer with later. Returning anything
    /// other than `Success` answers the read immediately with that code.
    pub fn register_deferred_read_handler<F>(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        allow_notifications: bool,
        allow_indications: bool,
        handler: F,
    ) -> PeripheralResult<()>
    where
        F: FnMut(DeferredToken) -> ReadResult + Send + 'static,
    {
        self.characteristics.register_with_properties(
            service_uuid,
            characteristic_uuid,
            CharacteristicProperties::from_flags(allow_notifications, allow_indications),
            CharacteristicHandler::DeferredRead(Box::new(handler)),
        )
    }

    pub fn register_write_handler<F>(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        handler: F,
    ) -> PeripheralResult<()>
    where
        F: FnMut(&[u8]) -> WriteResult + Send + 'static,
    {
        self.register_handler(
            service_uuid,
            characteristic_uuid,
            CharacteristicHandler::Write(Box::new(handler)),
        )
    }

    /// Registers a deferred write handler; see
    /// [`register_deferred_read_handler`](Self::register_deferred_read_handler)
    pub fn register_deferred_write_handler<F>(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        handler: F,
    ) -> PeripheralResult<()>
    where
        F: FnMut(DeferredToken, &[u8]) -> WriteResult + Send + 'static,
    {
        self.register_handler(
            service_uuid,
            characteristic_uuid,
            CharacteristicHandler::DeferredWrite(Box::new(handler)),
        )
    }

    pub fn register_subscription_changed_handler<F>(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        handler: F,
    ) -> PeripheralResult<()>
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.register_handler(
            service_uuid,
            characteristic_uuid,
            CharacteristicHandler::SubscriptionChanged(Box::new(handler)),
        )
    }

    pub fn set_characteristic_properties(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        properties: CharacteristicProperties,
    ) -> PeripheralResult<()> {
        self.characteristics
            .set_properties(service_uuid, characteristic_uuid, properties)
    }

    pub fn characteristic(
        &self,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Option<&CharacteristicEntry> {
        self.characteristics.find(service_uuid, characteristic_uuid)
    }

    /// Advertises a raw payload of at most 31 bytes.
    ///
    /// Takes effect immediately when ready, otherwise once the backend
    /// reports readiness.
    pub fn set_advertising_info(&mut self, period_ms: u32, payload: &[u8]) -> PeripheralResult<()> {
        self.advertising.configure(period_ms, payload)?;
        self.apply_advertising();
        Ok(())
    }

    /// Advertises flags plus a manufacturer specific structure
    pub fn set_advertising_info_manufacturer_specific(
        &mut self,
        period_ms: u32,
        company_code: u16,
        payload: &[u8],
    ) -> PeripheralResult<()> {
        self.advertising
            .configure_manufacturer_specific(period_ms, company_code, payload)?;
        self.apply_advertising();
        Ok(())
    }

    fn apply_advertising(&mut self) {
        if self.is_ready() {
            self.advertising.apply(&mut self.backend);
        } else {
            debug!("Advertising configured; waiting for backend readiness");
        }
    }

    /// Pushes a notification or indication to the peer.
    ///
    /// No queuing is done here; flow control is the backend's job.
    pub fn send_notification(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        data: &[u8],
    ) -> PeripheralResult<()> {
        let allowed = self
            .characteristics
            .find(service_uuid, characteristic_uuid)
            .map_or(false, |entry| entry.allows_push());
        if !allowed {
            warn!(
                "Notification refused for {}/{}: not registered for notify/indicate",
                service_uuid, characteristic_uuid
            );
            return Err(PeripheralError::NotPermitted);
        }
        if !self.is_ready() {
            return Err(PeripheralError::NotReady);
        }

        trace!(
            "Notify {}/{}: {}",
            service_uuid,
            characteristic_uuid,
            hex::encode(data)
        );
        self.backend
            .send_notification(service_uuid, characteristic_uuid, data);
        Ok(())
    }

    /// Answers a deferred read. The token is invalid afterwards.
    pub fn complete_deferred_read(
        &mut self,
        token: DeferredToken,
        result: ReadResult,
        data: &[u8],
    ) -> PeripheralResult<()> {
        let operation = self.complete_deferred(token, DeferredKind::Read)?;
        self.backend.send_deferred_read_response(
            &operation.address,
            &operation.service_uuid,
            &operation.characteristic_uuid,
            result,
            data,
        );
        Ok(())
    }

    /// Answers a deferred write. The token is invalid afterwards.
    pub fn complete_deferred_write(
        &mut self,
        token: DeferredToken,
        result: WriteResult,
    ) -> PeripheralResult<()> {
        let operation = self.complete_deferred(token, DeferredKind::Write)?;
        self.backend.send_deferred_write_response(
            &operation.address,
            &operation.service_uuid,
            &operation.characteristic_uuid,
            result,
        );
        Ok(())
    }

    fn complete_deferred(
        &mut self,
        token: DeferredToken,
        kind: DeferredKind,
    ) -> PeripheralResult<DeferredOperation> {
        self.deferred.complete(token, kind).map_err(|err| {
            warn!("Deferred {} completion rejected: {}", kind.as_str(), err);
            err
        })
    }

    /// Number of deferred reads/writes awaiting completion
    pub fn pending_deferred_operations(&self) -> usize {
        self.deferred.in_use()
    }

    /// Backend event: the radio is up
    pub fn notify_on_becomes_ready(&mut self) {
        match self.state {
            PeripheralState::Ready => {
                debug!("Backend reported readiness twice");
                return;
            }
            state if !state.can_become_ready() => {
                warn!("Backend reported readiness after a terminal init failure; ignoring");
                return;
            }
            _ => {}
        }

        info!("Peripheral is ready");
        self.state = PeripheralState::Ready;
        self.advertising.apply(&mut self.backend);
        self.listeners.notify_ready();
    }

    /// Backend event: bring-up failed
    pub fn notify_on_failed_init(&mut self, will_auto_retry: bool) {
        match self.state {
            PeripheralState::Ready => {
                warn!("Backend reported an init failure while ready; ignoring");
                return;
            }
            state if !state.can_become_ready() => {
                warn!("Backend reported another init failure after a terminal one; ignoring");
                return;
            }
            _ => {}
        }

        if will_auto_retry {
            warn!("Peripheral failed to initialize; backend will retry");
        } else {
            warn!("Peripheral failed to initialize; giving up");
        }
        self.state = PeripheralState::FailedInit { will_auto_retry };
        self.listeners.notify_failed_init(will_auto_retry);
    }

    /// Backend event: a central connected
    pub fn notify_connection_opened(&mut self, address: &BdAddr) {
        info!("Connection opened: {}", address);
        self.listeners.notify_connection_opened(address);
    }

    /// Backend event: a central disconnected
    pub fn notify_connection_closed(&mut self, address: &BdAddr) {
        info!("Connection closed: {}", address);
        if self.config.release_deferred_on_disconnect {
            self.deferred.release_for_address(address);
        }
        self.listeners.notify_connection_closed(address);
    }

    /// Backend event: the peer reads a characteristic.
    ///
    /// For an immediate answer the value is written into `data_out`.
    pub fn notify_read_request(
        &mut self,
        source: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        data_out: &mut FixedByteBuffer,
    ) -> RequestOutcome<ReadResult> {
        debug!("Read request from {} for {}/{}", source, service_uuid, characteristic_uuid);

        let Some(entry) = self.characteristics.find_mut(service_uuid, characteristic_uuid) else {
            warn!("Read of unknown characteristic {}/{}", service_uuid, characteristic_uuid);
            return RequestOutcome::Respond(ReadResult::AttributeNotFound);
        };
        let (service, characteristic) = entry.uuid_pair();

        match entry.read.as_mut() {
            Some(ReadAccess::Immediate(handler)) => {
                data_out.clear();
                let result = handler(&mut *data_out);
                trace!("Read result {:?}: {}", result, data_out.to_hex());
                RequestOutcome::Respond(result)
            }
            Some(ReadAccess::Deferred(handler)) => {
                let Some(token) =
                    self.deferred
                        .allocate(DeferredKind::Read, *source, service, characteristic)
                else {
                    return RequestOutcome::Respond(ReadResult::Unlikely);
                };

                match handler(token) {
                    ReadResult::Success => RequestOutcome::Deferred,
                    refused => {
                        self.deferred.release(token);
                        RequestOutcome::Respond(refused)
                    }
                }
            }
            None => RequestOutcome::Respond(ReadResult::NotPermitted),
        }
    }

    /// Backend event: the peer writes a characteristic
    pub fn notify_write_request(
        &mut self,
        source: &BdAddr,
        service_uuid: &str,
        characteristic_uuid: &str,
        data: &[u8],
    ) -> RequestOutcome<WriteResult> {
        debug!(
            "Write request from {} for {}/{}: {}",
            source,
            service_uuid,
            characteristic_uuid,
            hex::encode(data)
        );

        let Some(entry) = self.characteristics.find_mut(service_uuid, characteristic_uuid) else {
            warn!("Write of unknown characteristic {}/{}", service_uuid, characteristic_uuid);
            return RequestOutcome::Respond(WriteResult::AttributeNotFound);
        };
        let (service, characteristic) = entry.uuid_pair();

        match entry.write.as_mut() {
            Some(WriteAccess::Immediate(handler)) => RequestOutcome::Respond(handler(data)),
            Some(WriteAccess::Deferred(handler)) => {
                let Some(token) =
                    self.deferred
                        .allocate(DeferredKind::Write, *source, service, characteristic)
                else {
                    return RequestOutcome::Respond(WriteResult::Unlikely);
                };

                match handler(token, data) {
                    WriteResult::Success => RequestOutcome::Deferred,
                    refused => {
                        self.deferred.release(token);
                        RequestOutcome::Respond(refused)
                    }
                }
            }
            None => RequestOutcome::Respond(WriteResult::NotPermitted),
        }
    }

    /// Backend event: the peer changed its subscription.
    ///
    /// Dropped silently when no handler is registered.
    pub fn notify_subscription_changed(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        is_subscribed: bool,
    ) {
        debug!(
            "Subscription for {}/{} now {}",
            service_uuid, characteristic_uuid, is_subscribed
        );
        if let Some(handler) = self
            .characteristics
            .find_mut(service_uuid, characteristic_uuid)
            .and_then(|entry| entry.on_subscription_changed.as_mut())
        {
            handler(is_subscribed);
        }
    }
}
