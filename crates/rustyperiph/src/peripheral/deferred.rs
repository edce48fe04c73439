//! Deferred operation tracker
//!
//! A fixed pool of slots for reads and writes the application answers after
//! the request callback has returned. Each allocation hands out a
//! [`DeferredToken`] naming the slot and its generation. The generation is
//! bumped every time a slot is freed, so a token is single-use: once the
//! operation is completed (or swept) the token is stale, even if the slot
//! has since been reused by an unrelated request.
//!
//! The tracker does not deduplicate: two pending operations may share the
//! same peer address and UUID pair.

use crate::error::{PeripheralError, PeripheralResult};
use crate::gap::BdAddr;
use log::{debug, trace, warn};
use std::sync::Arc;

/// Direction of a deferred operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredKind {
    Read,
    Write,
}

impl DeferredKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeferredKind::Read => "read",
            DeferredKind::Write => "write",
        }
    }
}

/// Opaque handle to one in-flight deferred operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredToken {
    slot: usize,
    generation: u32,
}

/// An in-flight operation and the identity it must be answered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredOperation {
    pub kind: DeferredKind,
    pub address: BdAddr,
    pub service_uuid: Arc<str>,
    pub characteristic_uuid: Arc<str>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    operation: Option<DeferredOperation>,
}

impl Slot {
    fn is_in_use(&self) -> bool {
        self.operation.is_some()
    }

    fn free(&mut self) -> Option<DeferredOperation> {
        let operation = self.operation.take();
        if operation.is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
        operation
    }
}

/// Fixed pool of deferred operation slots
#[derive(Debug)]
pub struct DeferredOperationTracker {
    slots: Vec<Slot>,
}

impl DeferredOperationTracker {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::default);
        Self { slots }
    }

    /// Claims a free slot, or `None` when every slot is in use
    pub fn allocate(
        &mut self,
        kind: DeferredKind,
        address: BdAddr,
        service_uuid: Arc<str>,
        characteristic_uuid: Arc<str>,
    ) -> Option<DeferredToken> {
        let capacity = self.slots.len();
        let Some((slot, entry)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, entry)| !entry.is_in_use())
        else {
            warn!(
                "Deferred {} from {} for {}/{} refused: all {} slots in use",
                kind.as_str(),
                address,
                service_uuid,
                characteristic_uuid,
                capacity
            );
            return None;
        };

        trace!("Deferred {} allocated slot {} for {}", kind.as_str(), slot, address);
        entry.operation = Some(DeferredOperation {
            kind,
            address,
            service_uuid,
            characteristic_uuid,
        });

        Some(DeferredToken {
            slot,
            generation: entry.generation,
        })
    }

    /// Looks up the operation behind a live token
    pub fn get(&self, token: DeferredToken) -> Option<&DeferredOperation> {
        self.slots
            .get(token.slot)
            .filter(|slot| slot.generation == token.generation)
            .and_then(|slot| slot.operation.as_ref())
    }

    /// Frees the slot behind `token` and returns its operation.
    ///
    /// Fails with `StaleToken` if the token was already completed or swept,
    /// and with `DeferredKindMismatch` (leaving the slot pending) if the
    /// token belongs to the other direction.
    pub fn complete(
        &mut self,
        token: DeferredToken,
        kind: DeferredKind,
    ) -> PeripheralResult<DeferredOperation> {
        let slot = self
            .slots
            .get_mut(token.slot)
            .filter(|slot| slot.generation == token.generation && slot.is_in_use())
            .ok_or(PeripheralError::StaleToken)?;

        if let Some(operation) = &slot.operation {
            if operation.kind != kind {
                return Err(PeripheralError::DeferredKindMismatch {
                    expected: operation.kind.as_str(),
                });
            }
        }

        let operation = slot.free().ok_or(PeripheralError::StaleToken)?;
        debug!(
            "Deferred {} for {}/{} from {} completed",
            operation.kind.as_str(),
            operation.service_uuid,
            operation.characteristic_uuid,
            operation.address
        );
        Ok(operation)
    }

    /// Frees the slot without answering; returns false for a stale token
    pub fn release(&mut self, token: DeferredToken) -> bool {
        match self.slots.get_mut(token.slot) {
            Some(slot) if slot.generation == token.generation => slot.free().is_some(),
            _ => false,
        }
    }

    /// Frees every pending operation from `address`, returning how many
    pub fn release_for_address(&mut self, address: &BdAddr) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut() {
            let owned = slot
                .operation
                .as_ref()
                .map_or(false, |operation| operation.address == *address);
            if owned {
                slot.free();
                released += 1;
            }
        }
        if released > 0 {
            debug!("Released {} deferred operations held by {}", released, address);
        }
        released
    }

    /// Number of slots currently holding an operation
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_in_use()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
