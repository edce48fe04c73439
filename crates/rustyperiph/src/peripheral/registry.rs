//! Characteristic registry
//!
//! Fixed-capacity table of the characteristics exposed by the peripheral,
//! keyed by the (service UUID, characteristic UUID) string pair. Entries are
//! created by registration calls and never removed.

use super::types::*;
use crate::error::{PeripheralError, PeripheralResult, Table};
use log::{debug, warn};
use std::sync::Arc;

/// Read side of a characteristic; immediate and deferred are exclusive
pub enum ReadAccess {
    Immediate(ReadHandler),
    Deferred(DeferredReadHandler),
}

/// Write side of a characteristic; immediate and deferred are exclusive
pub enum WriteAccess {
    Immediate(WriteHandler),
    Deferred(DeferredWriteHandler),
}

/// One exposed characteristic and its handlers
pub struct CharacteristicEntry {
    service_uuid: Arc<str>,
    characteristic_uuid: Arc<str>,
    pub properties: CharacteristicProperties,
    pub read: Option<ReadAccess>,
    pub write: Option<WriteAccess>,
    pub on_subscription_changed: Option<SubscriptionChangedHandler>,
}

impl CharacteristicEntry {
    fn new(service_uuid: &str, characteristic_uuid: &str) -> Self {
        Self {
            service_uuid: Arc::from(service_uuid),
            characteristic_uuid: Arc::from(characteristic_uuid),
            properties: CharacteristicProperties::empty(),
            read: None,
            write: None,
            on_subscription_changed: None,
        }
    }

    pub fn service_uuid(&self) -> &str {
        &self.service_uuid
    }

    pub fn characteristic_uuid(&self) -> &str {
        &self.characteristic_uuid
    }

    /// Shared handles to the UUID pair, used to tag deferred operations
    pub(crate) fn uuid_pair(&self) -> (Arc<str>, Arc<str>) {
        (self.service_uuid.clone(), self.characteristic_uuid.clone())
    }

    pub fn matches(&self, service_uuid: &str, characteristic_uuid: &str) -> bool {
        &*self.service_uuid == service_uuid && &*self.characteristic_uuid == characteristic_uuid
    }

    pub fn allows_push(&self) -> bool {
        self.properties.can_push()
    }

    fn has_handler(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::ImmediateRead | HandlerKind::DeferredRead => self.read.is_some(),
            HandlerKind::ImmediateWrite | HandlerKind::DeferredWrite => self.write.is_some(),
            HandlerKind::SubscriptionChanged => self.on_subscription_changed.is_some(),
        }
    }

    fn install(&mut self, handler: CharacteristicHandler) {
        match handler {
            CharacteristicHandler::Read(h) => self.read = Some(ReadAccess::Immediate(h)),
            CharacteristicHandler::DeferredRead(h) => self.read = Some(ReadAccess::Deferred(h)),
            CharacteristicHandler::Write(h) => self.write = Some(WriteAccess::Immediate(h)),
            CharacteristicHandler::DeferredWrite(h) => self.write = Some(WriteAccess::Deferred(h)),
            CharacteristicHandler::SubscriptionChanged(h) => self.on_subscription_changed = Some(h),
        }
    }
}

impl std::fmt::Debug for CharacteristicEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacteristicEntry")
            .field("service_uuid", &self.service_uuid)
            .field("characteristic_uuid", &self.characteristic_uuid)
            .field("properties", &self.properties)
            .field("read", &self.read.as_ref().map(|r| matches!(r, ReadAccess::Deferred(_))))
            .field("write", &self.write.as_ref().map(|w| matches!(w, WriteAccess::Deferred(_))))
            .field("subscription", &self.on_subscription_changed.is_some())
            .finish()
    }
}

/// Fixed-capacity table of characteristics
pub struct CharacteristicRegistry {
    entries: Vec<CharacteristicEntry>,
    capacity: usize,
}

impl CharacteristicRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Registers a handler for the characteristic, creating the entry if needed.
    ///
    /// A second handler for the same direction (read, write or subscription)
    /// is refused with `Conflict`, whether immediate or deferred.
    pub fn register(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        handler: CharacteristicHandler,
    ) -> PeripheralResult<()> {
        self.insert(service_uuid, characteristic_uuid, None, handler)
    }

    /// Like [`register`](Self::register), also adding the push properties.
    ///
    /// Flags already set on the entry are kept.
    pub fn register_with_properties(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        properties: CharacteristicProperties,
        handler: CharacteristicHandler,
    ) -> PeripheralResult<()> {
        self.insert(service_uuid, characteristic_uuid, Some(properties), handler)
    }

    /// Sets the push properties, creating the entry if needed
    pub fn set_properties(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        properties: CharacteristicProperties,
    ) -> PeripheralResult<()> {
        let index = self.find_or_create(service_uuid, characteristic_uuid)?;
        self.entries[index].properties = properties;
        Ok(())
    }

    fn insert(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
        properties: Option<CharacteristicProperties>,
        handler: CharacteristicHandler,
    ) -> PeripheralResult<()> {
        let kind = handler.kind();

        if let Some(existing) = self.find(service_uuid, characteristic_uuid) {
            if existing.has_handler(kind) {
                warn!(
                    "Refusing second {} handler for {}/{}",
                    kind.as_str(),
                    service_uuid,
                    characteristic_uuid
                );
                return Err(PeripheralError::Conflict {
                    service: service_uuid.to_string(),
                    characteristic: characteristic_uuid.to_string(),
                    kind: kind.as_str(),
                });
            }
        }

        let index = self.find_or_create(service_uuid, characteristic_uuid)?;
        let entry = &mut self.entries[index];
        if let Some(props) = properties {
            entry.properties |= props;
        }
        entry.install(handler);

        debug!("Registered {} handler for {}/{}", kind, service_uuid, characteristic_uuid);
        Ok(())
    }

    fn find_or_create(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> PeripheralResult<usize> {
        if let Some(index) = self.position(service_uuid, characteristic_uuid) {
            return Ok(index);
        }

        if self.entries.len() >= self.capacity {
            warn!(
                "No room to register {}/{} ({} characteristics)",
                service_uuid, characteristic_uuid, self.capacity
            );
            return Err(PeripheralError::CapacityExceeded {
                table: Table::Characteristics,
                capacity: self.capacity,
            });
        }

        self.entries
            .push(CharacteristicEntry::new(service_uuid, characteristic_uuid));
        Ok(self.entries.len() - 1)
    }

    fn position(&self, service_uuid: &str, characteristic_uuid: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.matches(service_uuid, characteristic_uuid))
    }

    /// Exact, case-sensitive lookup
    pub fn find(
        &self,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Option<&CharacteristicEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(service_uuid, characteristic_uuid))
    }

    pub fn find_mut(
        &mut self,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Option<&mut CharacteristicEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.matches(service_uuid, characteristic_uuid))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_handler() -> CharacteristicHandler {
        CharacteristicHandler::Read(Box::new(|_| ReadResult::Success))
    }

    fn deferred_read_handler() -> CharacteristicHandler {
        CharacteristicHandler::DeferredRead(Box::new(|_| ReadResult::Success))
    }

    fn write_handler() -> CharacteristicHandler {
        CharacteristicHandler::Write(Box::new(|_| WriteResult::Success))
    }

    #[test]
    fn test_find_after_register() {
        let mut registry = CharacteristicRegistry::new(4);
        registry.register("180f", "2a19", read_handler()).unwrap();
        registry.register("180f", "2a1a", write_handler()).unwrap();

        let entry = registry.find("180f", "2a19").unwrap();
        assert_eq!(entry.service_uuid(), "180f");
        assert_eq!(entry.characteristic_uuid(), "2a19");
        assert!(matches!(entry.read, Some(ReadAccess::Immediate(_))));
        assert!(entry.write.is_none());

        let entry = registry.find("180f", "2a1a").unwrap();
        assert!(matches!(entry.write, Some(WriteAccess::Immediate(_))));

        // Lookup is case-sensitive
        assert!(registry.find("180F", "2a19").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_handlers_of_different_directions_share_an_entry() {
        let mut registry = CharacteristicRegistry::new(1);
        registry.register("svc", "chr", deferred_read_handler()).unwrap();
        registry
            .register(
                "svc",
                "chr",
                CharacteristicHandler::DeferredWrite(Box::new(|_, _| WriteResult::Success)),
            )
            .unwrap();
        registry
            .register("svc", "chr", CharacteristicHandler::SubscriptionChanged(Box::new(|_| {})))
            .unwrap();

        let entry = registry.find("svc", "chr").unwrap();
        assert!(matches!(entry.read, Some(ReadAccess::Deferred(_))));
        assert!(matches!(entry.write, Some(WriteAccess::Deferred(_))));
        assert!(entry.on_subscription_changed.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_direction_conflicts() {
        let mut registry = CharacteristicRegistry::new(4);
        registry.register("svc", "chr", read_handler()).unwrap();

        let err = registry.register("svc", "chr", deferred_read_handler()).unwrap_err();
        assert!(matches!(err, PeripheralError::Conflict { kind: "read", .. }));
        let err = registry.register("svc", "chr", read_handler()).unwrap_err();
        assert!(matches!(err, PeripheralError::Conflict { .. }));

        // The first handler survives
        assert!(matches!(
            registry.find("svc", "chr").unwrap().read,
            Some(ReadAccess::Immediate(_))
        ));
    }

    #[test]
    fn test_capacity_exceeded_leaves_table_untouched() {
        let mut registry = CharacteristicRegistry::new(2);
        registry.register("svc", "a", read_handler()).unwrap();
        registry.register("svc", "b", read_handler()).unwrap();

        let err = registry.register("svc", "c", read_handler()).unwrap_err();
        assert_eq!(
            err,
            PeripheralError::CapacityExceeded {
                table: Table::Characteristics,
                capacity: 2
            }
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.find("svc", "c").is_none());

        // Existing entries can still take more handlers
        registry.register("svc", "a", write_handler()).unwrap();
    }

    #[test]
    fn test_read_registration_keeps_existing_properties() {
        let mut registry = CharacteristicRegistry::new(1);
        registry
            .set_properties("svc", "chr", CharacteristicProperties::NOTIFY)
            .unwrap();
        registry
            .register_with_properties(
                "svc",
                "chr",
                CharacteristicProperties::empty(),
                deferred_read_handler(),
            )
            .unwrap();

        let entry = registry.find("svc", "chr").unwrap();
        assert_eq!(entry.properties, CharacteristicProperties::NOTIFY);
        assert!(entry.allows_push());
    }

    #[test]
    fn test_properties() {
        let mut registry = CharacteristicRegistry::new(2);
        registry
            .register_with_properties(
                "svc",
                "chr",
                CharacteristicProperties::NOTIFY,
                read_handler(),
            )
            .unwrap();
        assert!(registry.find("svc", "chr").unwrap().allows_push());

        registry
            .set_properties("svc", "other", CharacteristicProperties::INDICATE)
            .unwrap();
        let entry = registry.find("svc", "other").unwrap();
        assert!(entry.allows_push());
        assert!(entry.read.is_none());
    }
}
