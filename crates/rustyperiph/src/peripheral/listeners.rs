//! Lifecycle listeners
//!
//! Observers of readiness and connection events. Events fan out in
//! registration order; a listener that left a callback unset is skipped for
//! that event only.

use crate::error::{PeripheralError, PeripheralResult, Table};
use crate::gap::BdAddr;
use log::{trace, warn};

pub type ReadyCallback = Box<dyn FnMut() + Send>;
pub type FailedInitCallback = Box<dyn FnMut(bool) + Send>;
pub type ConnectionCallback = Box<dyn FnMut(&BdAddr) + Send>;

/// A set of optional lifecycle callbacks
#[derive(Default)]
pub struct Listener {
    on_ready: Option<ReadyCallback>,
    on_failed_init: Option<FailedInitCallback>,
    on_connection_opened: Option<ConnectionCallback>,
    on_connection_closed: Option<ConnectionCallback>,
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once the backend reports it is ready
    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// Called when the backend fails to initialize, with whether it will retry
    pub fn on_failed_init<F>(mut self, callback: F) -> Self
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.on_failed_init = Some(Box::new(callback));
        self
    }

    pub fn on_connection_opened<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&BdAddr) + Send + 'static,
    {
        self.on_connection_opened = Some(Box::new(callback));
        self
    }

    pub fn on_connection_closed<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&BdAddr) + Send + 'static,
    {
        self.on_connection_closed = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_failed_init", &self.on_failed_init.is_some())
            .field("on_connection_opened", &self.on_connection_opened.is_some())
            .field("on_connection_closed", &self.on_connection_closed.is_some())
            .finish()
    }
}

/// Fixed-capacity list of listeners
#[derive(Debug)]
pub struct ListenerRegistry {
    listeners: Vec<Listener>,
    capacity: usize,
}

impl ListenerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, listener: Listener) -> PeripheralResult<()> {
        if self.listeners.len() >= self.capacity {
            warn!("No room for another listener ({} max)", self.capacity);
            return Err(PeripheralError::CapacityExceeded {
                table: Table::Listeners,
                capacity: self.capacity,
            });
        }
        self.listeners.push(listener);
        Ok(())
    }

    pub fn notify_ready(&mut self) {
        trace!("Notifying {} listeners: ready", self.listeners.len());
        for callback in self.listeners.iter_mut().filter_map(|l| l.on_ready.as_mut()) {
            callback();
        }
    }

    pub fn notify_failed_init(&mut self, will_auto_retry: bool) {
        trace!("Notifying {} listeners: failed init", self.listeners.len());
        for callback in self.listeners.iter_mut().filter_map(|l| l.on_failed_init.as_mut()) {
            callback(will_auto_retry);
        }
    }

    pub fn notify_connection_opened(&mut self, address: &BdAddr) {
        for callback in self
            .listeners
            .iter_mut()
            .filter_map(|l| l.on_connection_opened.as_mut())
        {
            callback(address);
        }
    }

    pub fn notify_connection_closed(&mut self, address: &BdAddr) {
        for callback in self
            .listeners
            .iter_mut()
            .filter_map(|l| l.on_connection_closed.as_mut())
        {
            callback(address);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fan_out_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new(2);

        let first = log.clone();
        registry
            .add(Listener::new().on_connection_opened(move |addr| {
                first.lock().unwrap().push((1, *addr));
            }))
            .unwrap();
        let second = log.clone();
        registry
            .add(Listener::new().on_connection_opened(move |addr| {
                second.lock().unwrap().push((2, *addr));
            }))
            .unwrap();

        let addr = BdAddr::new([1, 2, 3, 4, 5, 6]);
        registry.notify_connection_opened(&addr);

        assert_eq!(*log.lock().unwrap(), vec![(1, addr), (2, addr)]);
    }

    #[test]
    fn test_missing_callbacks_are_skipped() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ListenerRegistry::new(2);

        registry.add(Listener::new()).unwrap();
        let seen = count.clone();
        registry
            .add(Listener::new().on_failed_init(move |retry| {
                assert!(retry);
                *seen.lock().unwrap() += 1;
            }))
            .unwrap();

        registry.notify_ready();
        registry.notify_failed_init(true);
        registry.notify_connection_closed(&BdAddr::default());

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_capacity() {
        let mut registry = ListenerRegistry::new(1);
        registry.add(Listener::new()).unwrap();
        assert_eq!(
            registry.add(Listener::new()).unwrap_err(),
            PeripheralError::CapacityExceeded {
                table: Table::Listeners,
                capacity: 1
            }
        );
        assert_eq!(registry.len(), 1);
    }
}
