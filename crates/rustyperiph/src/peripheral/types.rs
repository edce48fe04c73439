//! Peripheral data types

use super::constants::*;
use super::deferred::DeferredToken;
use crate::buffer::FixedByteBuffer;
use bitflags::bitflags;
use std::fmt;

/// Result of a read request, sent to the peer verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadResult {
    Success,
    NotPermitted,
    ValueNotAllowed,
    AttributeNotFound,
    Unlikely,
}

impl ReadResult {
    /// Raw ATT error code, 0 for success
    pub fn att_error_code(self) -> u8 {
        match self {
            ReadResult::Success => 0,
            ReadResult::NotPermitted => ATT_ERROR_NOT_PERMITTED,
            ReadResult::ValueNotAllowed => ATT_ERROR_VALUE_NOT_ALLOWED,
            ReadResult::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            ReadResult::Unlikely => ATT_ERROR_UNLIKELY,
        }
    }

    pub fn is_success(self) -> bool {
        self == ReadResult::Success
    }
}

impl From<ReadResult> for u16 {
    fn from(value: ReadResult) -> Self {
        match value {
            ReadResult::Success => 0x0000,
            other => ATT_RESULT_BASE | other.att_error_code() as u16,
        }
    }
}

impl TryFrom<u16> for ReadResult {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(ReadResult::Success),
            0x0403 => Ok(ReadResult::NotPermitted),
            0x0413 => Ok(ReadResult::ValueNotAllowed),
            0x040A => Ok(ReadResult::AttributeNotFound),
            0x040E => Ok(ReadResult::Unlikely),
            other => Err(other),
        }
    }
}

/// Result of a write request, sent to the peer verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteResult {
    Success,
    NotPermitted,
    ValueNotAllowed,
    AttributeNotFound,
    Unlikely,
}

impl WriteResult {
    /// Raw ATT error code, 0 for success
    pub fn att_error_code(self) -> u8 {
        match self {
            WriteResult::Success => 0,
            WriteResult::NotPermitted => ATT_ERROR_NOT_PERMITTED,
            WriteResult::ValueNotAllowed => ATT_ERROR_VALUE_NOT_ALLOWED,
            WriteResult::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            WriteResult::Unlikely => ATT_ERROR_UNLIKELY,
        }
    }

    pub fn is_success(self) -> bool {
        self == WriteResult::Success
    }
}

impl From<WriteResult> for u16 {
    fn from(value: WriteResult) -> Self {
        match value {
            WriteResult::Success => 0x0000,
            other => ATT_RESULT_BASE | other.att_error_code() as u16,
        }
    }
}

impl TryFrom<u16> for WriteResult {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(WriteResult::Success),
            0x0403 => Ok(WriteResult::NotPermitted),
            0x0413 => Ok(WriteResult::ValueNotAllowed),
            0x040A => Ok(WriteResult::AttributeNotFound),
            0x040E => Ok(WriteResult::Unlikely),
            other => Err(other),
        }
    }
}

/// What the backend should do with a request it just handed to the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome<R> {
    /// Respond right away with this result
    Respond(R),
    /// The application holds a token and will complete the request later
    Deferred,
}

impl<R> RequestOutcome<R> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, RequestOutcome::Deferred)
    }
}

/// Lifecycle of the peripheral core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    Uninitialized,
    AwaitingReady,
    Ready,
    FailedInit { will_auto_retry: bool },
}

impl PeripheralState {
    /// Whether the backend may still report readiness from this state
    pub fn can_become_ready(self) -> bool {
        !matches!(
            self,
            PeripheralState::FailedInit {
                will_auto_retry: false
            }
        )
    }
}

bitflags! {
    /// Server-initiated update modes a characteristic allows
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CharacteristicProperties: u8 {
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
    }
}

impl CharacteristicProperties {
    pub fn from_flags(allow_notifications: bool, allow_indications: bool) -> Self {
        let mut props = Self::empty();
        props.set(Self::NOTIFY, allow_notifications);
        props.set(Self::INDICATE, allow_indications);
        props
    }

    /// True when notifications or indications may be pushed
    pub fn can_push(self) -> bool {
        self.intersects(Self::NOTIFY | Self::INDICATE)
    }
}

/// Produces the value of a read synchronously
pub type ReadHandler = Box<dyn FnMut(&mut FixedByteBuffer) -> ReadResult + Send>;

/// Accepts a read that will be completed later through the given token
pub type DeferredReadHandler = Box<dyn FnMut(DeferredToken) -> ReadResult + Send>;

/// Consumes the value of a write synchronously
pub type WriteHandler = Box<dyn FnMut(&[u8]) -> WriteResult + Send>;

/// Accepts a write that will be completed later through the given token
pub type DeferredWriteHandler = Box<dyn FnMut(DeferredToken, &[u8]) -> WriteResult + Send>;

/// Observes subscription changes from the peer
pub type SubscriptionChangedHandler = Box<dyn FnMut(bool) + Send>;

/// The kind of handler being registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    ImmediateRead,
    DeferredRead,
    ImmediateWrite,
    DeferredWrite,
    SubscriptionChanged,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::ImmediateRead | HandlerKind::DeferredRead => "read",
            HandlerKind::ImmediateWrite | HandlerKind::DeferredWrite => "write",
            HandlerKind::SubscriptionChanged => "subscription",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A handler together with its kind
pub enum CharacteristicHandler {
    Read(ReadHandler),
    DeferredRead(DeferredReadHandler),
    Write(WriteHandler),
    DeferredWrite(DeferredWriteHandler),
    SubscriptionChanged(SubscriptionChangedHandler),
}

impl CharacteristicHandler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            CharacteristicHandler::Read(_) => HandlerKind::ImmediateRead,
            CharacteristicHandler::DeferredRead(_) => HandlerKind::DeferredRead,
            CharacteristicHandler::Write(_) => HandlerKind::ImmediateWrite,
            CharacteristicHandler::DeferredWrite(_) => HandlerKind::DeferredWrite,
            CharacteristicHandler::SubscriptionChanged(_) => HandlerKind::SubscriptionChanged,
        }
    }
}

impl fmt::Debug for CharacteristicHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CharacteristicHandler").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes_are_stable() {
        assert_eq!(u16::from(ReadResult::Success), 0x0000);
        assert_eq!(u16::from(ReadResult::NotPermitted), 0x0403);
        assert_eq!(u16::from(ReadResult::ValueNotAllowed), 0x0413);
        assert_eq!(u16::from(ReadResult::AttributeNotFound), 0x040A);
        assert_eq!(u16::from(ReadResult::Unlikely), 0x040E);

        assert_eq!(u16::from(WriteResult::NotPermitted), 0x0403);
        assert_eq!(WriteResult::try_from(0x040E), Ok(WriteResult::Unlikely));
        assert_eq!(ReadResult::try_from(0x0401), Err(0x0401));
    }

    #[test]
    fn test_properties() {
        assert!(!CharacteristicProperties::from_flags(false, false).can_push());
        assert!(CharacteristicProperties::from_flags(true, false).can_push());
        assert!(CharacteristicProperties::from_flags(false, true).can_push());
    }

    #[test]
    fn test_failed_init_readiness() {
        assert!(PeripheralState::FailedInit { will_auto_retry: true }.can_become_ready());
        assert!(!PeripheralState::FailedInit { will_auto_retry: false }.can_become_ready());
        assert!(PeripheralState::AwaitingReady.can_become_ready());
    }
}
