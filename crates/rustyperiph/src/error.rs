//! Error types for the rustyperiph library
//!
//! This module defines the error types used throughout the library.
//! Attribute protocol result codes sent to a remote peer are not errors and
//! live in [`crate::peripheral::types`].

use thiserror::Error;

/// The fixed-capacity table that ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Characteristics,
    Listeners,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Table::Characteristics => write!(f, "characteristics"),
            Table::Listeners => write!(f, "listeners"),
        }
    }
}

/// Errors raised by the byte container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer overflow: {requested} bytes requested, {free} free")]
    Overflow { requested: usize, free: usize },

    #[error("Index {index} out of bounds for buffer of length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Errors raised while parsing a colon-hex device address
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressParseError {
    #[error("Address string must be 17 characters, got {0}")]
    InvalidLength(usize),

    #[error("Address string must be 6 colon separated hex pairs")]
    InvalidSeparators,

    #[error("Invalid hex in address: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned by the peripheral core to local callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("Table of {table} is full (capacity {capacity})")]
    CapacityExceeded { table: Table, capacity: usize },

    #[error("A {kind} handler is already registered for {service}/{characteristic}")]
    Conflict {
        service: String,
        characteristic: String,
        kind: &'static str,
    },

    #[error("Operation not permitted on this characteristic")]
    NotPermitted,

    #[error("Deferred operation token is stale or unknown")]
    StaleToken,

    #[error("Deferred operation token belongs to a {expected} operation")]
    DeferredKindMismatch { expected: &'static str },

    #[error("Advertisement of {size} bytes exceeds the {max} byte maximum")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Peripheral is not ready")]
    NotReady,

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// Peripheral Result type
pub type PeripheralResult<T> = Result<T, PeripheralError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FixedByteBuffer;

    fn fill(buffer: &mut FixedByteBuffer, data: &[u8]) -> PeripheralResult<usize> {
        buffer.append(data)?;
        Ok(buffer.len())
    }

    #[test]
    fn test_buffer_error_converts() {
        let mut buffer = FixedByteBuffer::new(2);
        assert_eq!(fill(&mut buffer, &[1, 2]), Ok(2));
        assert_eq!(
            fill(&mut buffer, &[3]),
            Err(PeripheralError::Buffer(BufferError::Overflow {
                requested: 1,
                free: 0
            }))
        );
    }

    #[test]
    fn test_display() {
        let err = PeripheralError::CapacityExceeded {
            table: Table::Listeners,
            capacity: 2,
        };
        assert_eq!(err.to_string(), "Table of listeners is full (capacity 2)");
        assert_eq!(
            PeripheralError::PayloadTooLarge { size: 32, max: 31 }.to_string(),
            "Advertisement of 32 bytes exceeds the 31 byte maximum"
        );
    }
}
